//! In-process ranks connected by std mpsc channels.
//!
//! `ChannelComm::world(n)` builds `n` communicators meant to be moved onto
//! `n` threads, one rank each. Point-to-point messages carry `(source, tag,
//! payload)`; a per-rank stash holds messages that arrive ahead of the
//! matching `recv`. Collectives run through a shared accumulator guarded by
//! a condvar, so no rank returns before every contribution is in.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex};

use super::Comm;

type Packet = (usize, u16, Vec<f64>);

struct Inbox {
    rx: Receiver<Packet>,
    stash: VecDeque<Packet>,
}

struct ReduceState {
    accum: Vec<f64>,
    arrived: usize,
    result: Vec<f64>,
    generation: u64,
}

struct Shared {
    reduce: Mutex<ReduceState>,
    done: Condvar,
}

pub struct ChannelComm {
    rank: usize,
    size: usize,
    peers: Vec<Sender<Packet>>,
    inbox: Mutex<Inbox>,
    shared: Arc<Shared>,
}

impl ChannelComm {
    /// Fully connected world of `size` in-process ranks.
    pub fn world(size: usize) -> Vec<ChannelComm> {
        assert!(size > 0);
        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let shared = Arc::new(Shared {
            reduce: Mutex::new(ReduceState {
                accum: Vec::new(),
                arrived: 0,
                result: Vec::new(),
                generation: 0,
            }),
            done: Condvar::new(),
        });
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| ChannelComm {
                rank,
                size,
                peers: senders.clone(),
                inbox: Mutex::new(Inbox {
                    rx,
                    stash: VecDeque::new(),
                }),
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Comm for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, peer: usize, tag: u16, data: &[f64]) {
        self.peers[peer]
            .send((self.rank, tag, data.to_vec()))
            .expect("peer rank hung up");
    }

    fn recv(&self, peer: usize, tag: u16, out: &mut [f64]) {
        let mut inbox = self.inbox.lock().expect("inbox poisoned");
        if let Some(pos) = inbox
            .stash
            .iter()
            .position(|(src, t, _)| *src == peer && *t == tag)
        {
            let (_, _, payload) = inbox.stash.remove(pos).unwrap();
            out.copy_from_slice(&payload);
            return;
        }
        loop {
            let packet = inbox.rx.recv().expect("peer rank hung up");
            if packet.0 == peer && packet.1 == tag {
                out.copy_from_slice(&packet.2);
                return;
            }
            inbox.stash.push_back(packet);
        }
    }

    fn allreduce_sum(&self, data: &mut [f64]) {
        let mut state = self.shared.reduce.lock().expect("reduce state poisoned");
        if state.arrived == 0 {
            state.accum = data.to_vec();
        } else {
            assert_eq!(state.accum.len(), data.len(), "mismatched reduce lengths");
            for (acc, v) in state.accum.iter_mut().zip(data.iter()) {
                *acc += v;
            }
        }
        state.arrived += 1;
        if state.arrived == self.size {
            state.result = std::mem::take(&mut state.accum);
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            data.copy_from_slice(&state.result);
            self.shared.done.notify_all();
        } else {
            let generation = state.generation;
            while state.generation == generation {
                state = self
                    .shared
                    .done
                    .wait(state)
                    .expect("reduce state poisoned");
            }
            data.copy_from_slice(&state.result);
        }
    }
}
