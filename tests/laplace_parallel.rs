//! Four-rank inversion tests over in-process channel ranks: every
//! distributed variant against the single-rank direct solve, warm-start
//! iteration statistics, and the iteration-cap error path.

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;

use lapinv::config::SolverOptions;
use lapinv::core::{Field2D, Field3D, FieldPerp};
use lapinv::error::LapError;
use lapinv::laplace::Laplacian;
use lapinv::mesh::{Coordinates, Mesh1D};
use lapinv::parallel::{ChannelComm, SerialComm};
use lapinv::solver::SolverKind;

const NZ: usize = 8;
const NXPE: usize = 4;
const NX_PER_RANK: usize = 2;
const GUARDS: usize = 1;
const NY: usize = 2;

fn coords() -> Coordinates {
    Coordinates::uniform(0.3, 0.3, NZ)
}

// Screened operator: the negative shift keeps every mode's interface
// couplings strictly inside the unit disc, so the iterative variants
// contract at a healthy rate.
fn coef_a(_g: usize) -> f64 {
    -5.0
}

fn coef_c(g: usize) -> f64 {
    1.0 + 0.04 * g as f64
}

fn coef_d(_g: usize) -> f64 {
    1.2
}

fn rhs_val(g: usize, jy: usize, iz: usize) -> f64 {
    let th = 2.0 * std::f64::consts::PI * iz as f64 / NZ as f64;
    (0.7 * g as f64 + jy as f64).sin() * (1.0 + th.cos() + 0.5 * (2.0 * th).sin())
        + 0.3 * (3.0 * th).cos()
        + 0.1 * (4.0 * th).cos()
}

fn local_mesh(rank: usize) -> Mesh1D {
    Mesh1D::new(NX_PER_RANK, NY, NZ, GUARDS, NXPE, rank).unwrap()
}

/// Global x index of a rank's local radial index.
fn global_ix(rank: usize, ix: usize) -> usize {
    NX_PER_RANK * rank + ix
}

fn local_laplacian(rank: usize, kind: SolverKind, options: SolverOptions) -> Laplacian {
    let mesh = local_mesh(rank);
    let ncx = mesh.local_nx;
    let mut lap = Laplacian::new(mesh, coords(), kind, options).unwrap();
    lap.set_coef_a(Field2D::from_fn(ncx, NY, |ix, _| coef_a(global_ix(rank, ix))));
    lap.set_coef_c(Field2D::from_fn(ncx, NY, |ix, _| coef_c(global_ix(rank, ix))));
    lap.set_coef_d(Field2D::from_fn(ncx, NY, |ix, _| coef_d(global_ix(rank, ix))));
    lap
}

fn local_rhs(rank: usize, jy: usize) -> FieldPerp {
    let ncx = local_mesh(rank).local_nx;
    FieldPerp::from_fn(ncx, NZ, jy, |ix, iz| rhs_val(global_ix(rank, ix), jy, iz))
}

/// Direct single-rank reference over the whole radial domain.
fn serial_reference(jy: usize) -> FieldPerp {
    let mesh = Mesh1D::new(NX_PER_RANK * NXPE, NY, NZ, GUARDS, 1, 0).unwrap();
    let ncx = mesh.local_nx;
    let mut lap = Laplacian::new(
        mesh,
        coords(),
        SolverKind::ParallelTri,
        SolverOptions::default(),
    )
    .unwrap();
    lap.set_coef_a(Field2D::from_fn(ncx, NY, |g, _| coef_a(g)));
    lap.set_coef_c(Field2D::from_fn(ncx, NY, |g, _| coef_c(g)));
    lap.set_coef_d(Field2D::from_fn(ncx, NY, |g, _| coef_d(g)));
    let rhs = FieldPerp::from_fn(ncx, NZ, jy, |g, iz| rhs_val(g, jy, iz));
    let x0 = FieldPerp::zeros(ncx, NZ, jy);
    lap.solve_perp(&SerialComm, &rhs, &x0).unwrap()
}

fn run_world<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize, ChannelComm) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = ChannelComm::world(size)
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            let f = Arc::clone(&f);
            thread::spawn(move || f(rank, comm))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn check_against_serial(kind: SolverKind, options: SolverOptions, tol: f64) {
    let planes = run_world(NXPE, move |rank, comm| {
        let mut lap = local_laplacian(rank, kind, options.clone());
        let rhs = local_rhs(rank, 0);
        let x0 = FieldPerp::zeros(rhs.nx(), NZ, 0);
        lap.solve_perp(&comm, &rhs, &x0).unwrap()
    });
    let reference = serial_reference(0);

    for (rank, plane) in planes.iter().enumerate() {
        let mesh = local_mesh(rank);
        let lo = if mesh.first_x() { 0 } else { mesh.xstart };
        let hi = if mesh.last_x() {
            mesh.local_nx - 1
        } else {
            mesh.xend
        };
        for ix in lo..=hi {
            let g = global_ix(rank, ix);
            for iz in 0..NZ {
                assert_abs_diff_eq!(plane[(ix, iz)], reference[(g, iz)], epsilon = tol);
            }
        }
    }
}

fn tight() -> SolverOptions {
    SolverOptions {
        rtol: 1e-11,
        atol: 1e-14,
        maxits: 500,
        ..Default::default()
    }
}

#[test]
fn parallel_tri_matches_serial() {
    check_against_serial(SolverKind::ParallelTri, tight(), 1e-6);
}

#[test]
fn red_black_matches_serial() {
    check_against_serial(SolverKind::RedBlack, tight(), 1e-6);
}

#[test]
fn multigrid_matches_serial() {
    let options = SolverOptions {
        max_level: 2,
        max_cycle: 2,
        predict_exit: true,
        ..tight()
    };
    check_against_serial(SolverKind::Multigrid, options, 1e-6);
}

#[test]
fn pcr_matches_serial() {
    check_against_serial(SolverKind::Pcr, SolverOptions::default(), 1e-8);
}

/// The batched 3D entry point agrees with the plane-by-plane reference.
#[test]
fn pcr_batches_three_dimensional_solves() {
    let planes = run_world(NXPE, |rank, comm| {
        let mut lap = local_laplacian(rank, SolverKind::Pcr, SolverOptions::default());
        let ncx = local_mesh(rank).local_nx;
        let rhs = Field3D::from_fn(ncx, NY, NZ, |ix, jy, iz| {
            rhs_val(global_ix(rank, ix), jy, iz)
        });
        let x0 = Field3D::zeros(ncx, NY, NZ);
        lap.solve(&comm, &rhs, &x0).unwrap()
    });

    for jy in 0..NY {
        let reference = serial_reference(jy);
        for (rank, sol) in planes.iter().enumerate() {
            let mesh = local_mesh(rank);
            for ix in mesh.xstart..=mesh.xend {
                let g = global_ix(rank, ix);
                for iz in 0..NZ {
                    assert_abs_diff_eq!(sol[(ix, jy, iz)], reference[(g, iz)], epsilon = 1e-8);
                }
            }
        }
    }
}

/// Warm-started repeat solves converge in fewer interface iterations, and a
/// reset clears the statistics.
#[test]
fn warm_start_stabilizes_iteration_counts() {
    let stats = run_world(NXPE, |rank, comm| {
        let options = SolverOptions {
            use_previous_timestep: true,
            ..tight()
        };
        let mut lap = local_laplacian(rank, SolverKind::ParallelTri, options);
        let rhs = local_rhs(rank, 0);
        let x0 = FieldPerp::zeros(rhs.nx(), NZ, 0);
        let mut first = 0.0;
        let mut last = 0.0;
        for call in 0..5 {
            lap.solve_perp(&comm, &rhs, &x0).unwrap();
            if call == 0 {
                first = lap.mean_iterations();
            }
            last = lap.mean_iterations();
        }
        lap.reset_solver();
        let reset = lap.mean_iterations();
        (first, last, reset)
    });
    for (first, last, reset) in stats {
        assert!(first >= 1.0, "cold solve should iterate, got {first}");
        assert!(last < first, "warm starts should lower the mean ({last} vs {first})");
        assert_eq!(reset, 0.0);
    }
}

/// Tightening the tolerance cannot reduce the iteration count.
#[test]
fn iteration_count_grows_with_tighter_tolerance() {
    let counts = run_world(NXPE, |rank, comm| {
        let mut means = Vec::new();
        for rtol in [1e-4, 1e-10] {
            let options = SolverOptions {
                rtol,
                maxits: 500,
                ..Default::default()
            };
            let mut lap = local_laplacian(rank, SolverKind::RedBlack, options);
            let rhs = local_rhs(rank, 0);
            let x0 = FieldPerp::zeros(rhs.nx(), NZ, 0);
            lap.solve_perp(&comm, &rhs, &x0).unwrap();
            means.push(lap.mean_iterations());
        }
        (means[0], means[1])
    });
    for (loose, strict) in counts {
        assert!(loose <= strict, "loose {loose} vs strict {strict}");
    }
}

mod sine_mode {
    //! Four ranks of eight interior points each, `A = 0`, `C = 1`, `D = 1`,
    //! zero-Dirichlet walls, and a single sine mode in z. The discrete
    //! solution is the radial sine profile the right-hand side was built
    //! from, so every variant must reproduce it pointwise.

    use super::*;

    const NXL: usize = 8;
    const NGLOB: usize = NXL * NXPE;
    const DX: f64 = 0.25;
    const DZ: f64 = 0.25;

    /// Radial profile vanishing at the half-index domain faces, so the
    /// half-sum Dirichlet rows are satisfied exactly.
    fn profile(g: usize) -> f64 {
        (std::f64::consts::PI * (g as f64 - 0.5) / NGLOB as f64).sin()
    }

    /// `kwave` of the z mode the right-hand side excites.
    fn kmode() -> f64 {
        2.0 * std::f64::consts::PI / (DZ * NZ as f64)
    }

    /// The discrete operator applied to the profile, per interior point.
    fn rhs_mode(g: usize) -> f64 {
        let k = kmode();
        (profile(g - 1) - 2.0 * profile(g) + profile(g + 1)) / (DX * DX) - k * k * profile(g)
    }

    fn expected(g: usize, iz: usize) -> f64 {
        profile(g) * (2.0 * std::f64::consts::PI * iz as f64 / NZ as f64).sin()
    }

    fn solve_on(rank: usize, comm: &ChannelComm, kind: SolverKind, repeats: usize) -> (FieldPerp, Vec<f64>) {
        let mesh = Mesh1D::new(NXL, 1, NZ, GUARDS, NXPE, rank).unwrap();
        let ncx = mesh.local_nx;
        let options = SolverOptions {
            rtol: 1e-9,
            ..Default::default()
        };
        let mut lap = Laplacian::new(mesh, Coordinates::uniform(DX, DZ, NZ), kind, options).unwrap();
        lap.set_coef_a(Field2D::from_fn(ncx, 1, |_, _| 0.0));
        lap.set_coef_c(Field2D::from_fn(ncx, 1, |_, _| 1.0));
        lap.set_coef_d(Field2D::from_fn(ncx, 1, |_, _| 1.0));
        let rhs = FieldPerp::from_fn(ncx, NZ, 0, |ix, iz| {
            let g = NXL * rank + ix;
            if g == 0 || g == NGLOB + 1 {
                0.0
            } else {
                rhs_mode(g) * (2.0 * std::f64::consts::PI * iz as f64 / NZ as f64).sin()
            }
        });
        let x0 = FieldPerp::zeros(ncx, NZ, 0);
        let mut sol = lap.solve_perp(comm, &rhs, &x0).unwrap();
        let mut means = vec![lap.mean_iterations()];
        for _ in 1..repeats {
            sol = lap.solve_perp(comm, &rhs, &x0).unwrap();
            means.push(lap.mean_iterations());
        }
        (sol, means)
    }

    #[test]
    fn every_variant_recovers_the_profile() {
        for kind in [
            SolverKind::ParallelTri,
            SolverKind::RedBlack,
            SolverKind::Multigrid,
            SolverKind::Pcr,
        ] {
            let planes = run_world(NXPE, move |rank, comm| solve_on(rank, &comm, kind, 1).0);
            for (rank, plane) in planes.iter().enumerate() {
                let mesh = Mesh1D::new(NXL, 1, NZ, GUARDS, NXPE, rank).unwrap();
                let lo = if mesh.first_x() { 0 } else { mesh.xstart };
                let hi = if mesh.last_x() {
                    mesh.local_nx - 1
                } else {
                    mesh.xend
                };
                for ix in lo..=hi {
                    let g = NXL * rank + ix;
                    for iz in 0..NZ {
                        assert_abs_diff_eq!(plane[(ix, iz)], expected(g, iz), epsilon = 1e-6);
                    }
                }
            }
        }
    }

    /// Repeating the identical solve five times leaves the running mean of
    /// interface iterations settled to well within one iteration.
    #[test]
    fn mean_iterations_settle_over_repeated_solves() {
        let stats = run_world(NXPE, |rank, comm| {
            solve_on(rank, &comm, SolverKind::ParallelTri, 5).1
        });
        for means in stats {
            assert_eq!(means.len(), 5);
            for pair in means.windows(2) {
                assert!(
                    (pair[1] - pair[0]).abs() < 1.0,
                    "mean jumped from {} to {}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }
}

/// The edge ranks of this fixture converge a couple of iterations before
/// the middle ranks. A cap set between the two counts must still let every
/// rank finish the plane: the capped ranks report the failure while the
/// converged ranks return normally.
#[test]
fn iteration_cap_with_uneven_convergence_completes() {
    let results = run_world(NXPE, |rank, comm| {
        let options = SolverOptions {
            maxits: 54,
            ..tight()
        };
        let mut lap = local_laplacian(rank, SolverKind::ParallelTri, options);
        let rhs = local_rhs(rank, 0);
        let x0 = FieldPerp::zeros(rhs.nx(), NZ, 0);
        lap.solve_perp(&comm, &rhs, &x0)
    });
    let mut failures = 0;
    for res in results {
        match res {
            Ok(_) => {}
            Err(LapError::MaxitsDominant { maxits: 54, .. }) => failures += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert!(failures > 0, "the cap should trip on the slower ranks");
}

/// A zero iteration budget fails on every rank.
#[test]
fn iteration_cap_reports_dominance() {
    let errors = run_world(NXPE, |rank, comm| {
        let options = SolverOptions {
            maxits: 0,
            ..Default::default()
        };
        let mut lap = local_laplacian(rank, SolverKind::ParallelTri, options);
        let rhs = local_rhs(rank, 0);
        let x0 = FieldPerp::zeros(rhs.nx(), NZ, 0);
        lap.solve_perp(&comm, &rhs, &x0).unwrap_err()
    });
    for err in errors {
        assert!(
            matches!(err, LapError::MaxitsDominant { maxits: 0, .. }),
            "unexpected error: {err}"
        );
    }
}
