//! Channel Message Fabric
//!
//! A rank-addressed, tagged bus built from plain channels: every ordered
//! pair of ranks gets one queue per tag, so frames between two peers with
//! the same tag arrive in send order and never mix with other tags.
//!
//! Sends enqueue immediately (the peer buffers, like a buffered message
//! bus); receives block the calling thread until the matching peer frame
//! arrives. An endpoint belongs to exactly one thread at a time: it is
//! `Send` but deliberately not `Sync`.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use super::error::BusError;
use super::types::{Rank, Tag};

const TAGS: [Tag; 4] = [Tag::Command, Tag::Answers, Tag::Exams, Tag::Results];

pub struct ChannelBus;

impl ChannelBus {
    /// Builds a fully connected fabric of `size` endpoints; endpoint `i`
    /// speaks as rank `i`. The cohort size is fixed for the fabric's
    /// lifetime.
    pub fn new(size: usize) -> Vec<BusEndpoint> {
        let mut endpoints: Vec<BusEndpoint> = (0..size)
            .map(|rank| BusEndpoint {
                rank,
                size,
                outgoing: HashMap::new(),
                incoming: HashMap::new(),
            })
            .collect();

        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                for tag in TAGS {
                    let (sender, receiver) = channel();
                    endpoints[src].outgoing.insert((dst, tag), sender);
                    endpoints[dst].incoming.insert((src, tag), receiver);
                }
            }
        }

        endpoints
    }
}

/// One rank's connection to every peer.
pub struct BusEndpoint {
    rank: Rank,
    size: usize,
    outgoing: HashMap<(Rank, Tag), Sender<Vec<u8>>>,
    incoming: HashMap<(Rank, Tag), Receiver<Vec<u8>>>,
}

impl BusEndpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Total number of participants, master included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Enqueues one frame for `dest`. `UnknownRank` covers both ranks
    /// outside the cohort and sends to self.
    pub fn send(&self, dest: Rank, tag: Tag, frame: Vec<u8>) -> Result<(), BusError> {
        let sender = self
            .outgoing
            .get(&(dest, tag))
            .ok_or(BusError::UnknownRank(dest))?;
        sender
            .send(frame)
            .map_err(|_| BusError::Disconnected { rank: dest, tag })
    }

    /// Blocks until the next frame from `src` with `tag` arrives.
    pub fn recv(&self, src: Rank, tag: Tag) -> Result<Vec<u8>, BusError> {
        let receiver = self
            .incoming
            .get(&(src, tag))
            .ok_or(BusError::UnknownRank(src))?;
        receiver
            .recv()
            .map_err(|_| BusError::Disconnected { rank: src, tag })
    }
}
