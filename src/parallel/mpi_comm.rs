//! MPI backend for multi-process runs, available behind the `mpi` feature.

use mpi::collective::SystemOperation;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::Comm;

/// Wrapper over the MPI world communicator.
pub struct MpiComm {
    pub world: SimpleCommunicator,
    rank: usize,
    size: usize,
    /// Keeps MPI initialized for the lifetime of the communicator.
    _universe: mpi::environment::Universe,
}

impl MpiComm {
    /// Initializes MPI and binds to the world communicator.
    ///
    /// # Panics
    /// Panics if MPI was already initialized or fails to initialize.
    pub fn new() -> Self {
        let universe = mpi::initialize().expect("MPI initialization failed");
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        MpiComm {
            world,
            rank,
            size,
            _universe: universe,
        }
    }
}

impl Default for MpiComm {
    fn default() -> Self {
        Self::new()
    }
}

impl Comm for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, peer: usize, tag: u16, data: &[f64]) {
        self.world
            .process_at_rank(peer as i32)
            .send_with_tag(data, tag as i32);
    }

    fn recv(&self, peer: usize, tag: u16, out: &mut [f64]) {
        let (msg, _status) = self
            .world
            .process_at_rank(peer as i32)
            .receive_vec_with_tag::<f64>(tag as i32);
        out.copy_from_slice(&msg);
    }

    fn sendrecv(&self, peer: usize, send_tag: u16, data: &[f64], recv_tag: u16, out: &mut [f64]) {
        // Nonblocking send paired with a blocking receive keeps symmetric
        // exchanges free of rendezvous deadlock.
        mpi::request::scope(|scope| {
            let sreq = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(scope, data, send_tag as i32);
            let (msg, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<f64>(recv_tag as i32);
            out.copy_from_slice(&msg);
            sreq.wait();
        });
    }

    fn allreduce_sum(&self, data: &mut [f64]) {
        let local = data.to_vec();
        self.world
            .all_reduce_into(&local[..], data, SystemOperation::sum());
    }
}
