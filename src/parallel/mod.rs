//! Communication layer for the x-direction decomposition.
//!
//! Solvers talk to their radial neighbours (and, for cyclic reduction, to
//! arbitrary peers) through the [`Comm`] trait. Three backends are provided:
//! [`SerialComm`] for single-rank runs, [`ChannelComm`] for in-process ranks
//! on std mpsc channels (used heavily by the test suite), and `MpiComm`
//! behind the `mpi` cargo feature.

use num_complex::Complex64;

pub mod channel;
pub use channel::ChannelComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Point-to-point and collective operations over the x ranks.
///
/// Messages are flat `f64` buffers; matching is by `(peer, tag)` and
/// delivery per pair is in send order. Methods are infallible: a broken
/// transport is unrecoverable and panics, matching the backend init
/// contract.
pub trait Comm: Send {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn send(&self, peer: usize, tag: u16, data: &[f64]);

    /// Blocks until a matching message arrives; `out.len()` must equal the
    /// sent length.
    fn recv(&self, peer: usize, tag: u16, out: &mut [f64]);

    /// Paired exchange with one peer.
    fn sendrecv(&self, peer: usize, send_tag: u16, data: &[f64], recv_tag: u16, out: &mut [f64]) {
        self.send(peer, send_tag, data);
        self.recv(peer, recv_tag, out);
    }

    /// Element-wise sum over all ranks, result replicated everywhere.
    fn allreduce_sum(&self, data: &mut [f64]);

    /// Logical AND over all ranks.
    fn allreduce_and(&self, value: bool) -> bool {
        let mut buf = [if value { 1.0 } else { 0.0 }];
        self.allreduce_sum(&mut buf);
        buf[0] >= self.size() as f64 - 0.5
    }
}

/// One interface record exchanged during the convergence handshake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaloMessage {
    pub value: Complex64,
    /// Sender has converged on this boundary and will not pair again.
    pub done: bool,
}

impl HaloMessage {
    pub const WIRE_LEN: usize = 3;

    pub fn pack(&self, out: &mut [f64]) {
        out[0] = self.value.re;
        out[1] = self.value.im;
        out[2] = if self.done { 1.0 } else { 0.0 };
    }

    pub fn unpack(wire: &[f64]) -> Self {
        Self {
            value: Complex64::new(wire[0], wire[1]),
            done: wire[2] != 0.0,
        }
    }
}

/// Paired exchange of one [`HaloMessage`] with a neighbour.
pub fn sendrecv_message(comm: &dyn Comm, peer: usize, tag: u16, msg: HaloMessage) -> HaloMessage {
    let mut wire = [0.0; HaloMessage::WIRE_LEN];
    msg.pack(&mut wire);
    let mut back = [0.0; HaloMessage::WIRE_LEN];
    comm.sendrecv(peer, tag, &wire, tag, &mut back);
    HaloMessage::unpack(&back)
}

pub fn send_complex(comm: &dyn Comm, peer: usize, tag: u16, data: &[Complex64]) {
    comm.send(peer, tag, &pack_complex(data));
}

pub fn recv_complex(comm: &dyn Comm, peer: usize, tag: u16, out: &mut [Complex64]) {
    let mut wire = vec![0.0; 2 * out.len()];
    comm.recv(peer, tag, &mut wire);
    unpack_complex(&wire, out);
}

pub fn pack_complex(data: &[Complex64]) -> Vec<f64> {
    let mut wire = Vec::with_capacity(2 * data.len());
    for v in data {
        wire.push(v.re);
        wire.push(v.im);
    }
    wire
}

pub fn unpack_complex(wire: &[f64], out: &mut [Complex64]) {
    for (v, w) in out.iter_mut().zip(wire.chunks_exact(2)) {
        *v = Complex64::new(w[0], w[1]);
    }
}

/// Single-rank backend. Neighbour exchanges never happen; calling one is a
/// logic error in the decomposition setup.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, peer: usize, _tag: u16, _data: &[f64]) {
        panic!("serial run has no rank {peer} to send to");
    }

    fn recv(&self, peer: usize, _tag: u16, _out: &mut [f64]) {
        panic!("serial run has no rank {peer} to receive from");
    }

    fn allreduce_sum(&self, _data: &mut [f64]) {}
}
