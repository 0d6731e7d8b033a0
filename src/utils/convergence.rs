//! Convergence bookkeeping shared by the iterative solver variants.

/// Absolute/relative tolerance pair.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub atol: f64,
    pub rtol: f64,
}

impl Tolerances {
    /// Converged when either error measure is inside its tolerance.
    pub fn met(&self, error_abs: f64, error_rel: f64) -> bool {
        error_abs < self.atol || error_rel < self.rtol
    }
}

/// Handshake state for one mode on one rank.
///
/// `self_*` flags mark local convergence toward a boundary; `neighbour_*`
/// flags mark that the neighbour announced it will not pair again. Physical
/// boundaries have no neighbour, so those flags start true.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceFlags {
    pub self_in: bool,
    pub self_out: bool,
    pub neighbour_in: bool,
    pub neighbour_out: bool,
}

impl ConvergenceFlags {
    pub fn new(first_x: bool, last_x: bool) -> Self {
        Self {
            self_in: false,
            self_out: false,
            neighbour_in: first_x,
            neighbour_out: last_x,
        }
    }

    /// The rank may stop iterating this mode.
    pub fn all_done(&self) -> bool {
        self.self_in && self.self_out
    }

    /// Fold the neighbours' announcements into the local state. Applied
    /// after the break check so a rank does one extra sweep with the final
    /// neighbour values.
    pub fn absorb_neighbours(&mut self) {
        self.self_in |= self.neighbour_in;
        self.self_out |= self.neighbour_out;
    }
}

/// Running mean of iteration counts over the lifetime of a solver instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationStats {
    mean_its: f64,
    ncalls: usize,
}

impl IterationStats {
    pub fn record(&mut self, count: usize) {
        self.ncalls += 1;
        self.mean_its =
            (self.mean_its * (self.ncalls - 1) as f64 + count as f64) / self.ncalls as f64;
    }

    pub fn mean_iterations(&self) -> f64 {
        self.mean_its
    }

    pub fn calls(&self) -> usize {
        self.ncalls
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut stats = IterationStats::default();
        for count in [4, 8, 6] {
            stats.record(count);
        }
        assert_abs_diff_eq!(stats.mean_iterations(), 6.0, epsilon = 1e-12);
        assert_eq!(stats.calls(), 3);
        stats.reset();
        assert_eq!(stats.calls(), 0);
        assert_eq!(stats.mean_iterations(), 0.0);
    }

    #[test]
    fn boundary_ranks_start_with_neighbour_flags_set() {
        let f = ConvergenceFlags::new(true, false);
        assert!(f.neighbour_in);
        assert!(!f.neighbour_out);
        assert!(!f.all_done());

        let mut g = ConvergenceFlags::new(true, true);
        g.absorb_neighbours();
        assert!(g.all_done());
    }
}
