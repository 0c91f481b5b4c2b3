// Copyright (c) 2024 Mike Tsao. All rights reserved.

use crossbeam_channel::{Receiver, Sender};

/// Both halves of an unbounded [crossbeam_channel], created together. The
/// event loop keeps the receiver and hands clones of the sender to each
/// input source.
#[derive(Debug)]
pub struct ChannelPair<T> {
    #[allow(missing_docs)]
    pub sender: Sender<T>,
    #[allow(missing_docs)]
    pub receiver: Receiver<T>,
}
impl<T> Default for ChannelPair<T> {
    fn default() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}
impl<T> ChannelPair<T> {
    /// Another sender for the same channel.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }
}
