//! Protocol logic of a bid cycle. Nothing in here talks to a network
//! directly; the boundaries are the traits in [`chain`] and [`quote`].
pub mod bid;
pub mod chain;
pub mod cycle;
pub mod eth;
pub mod quote;
pub mod window;

pub use {
    bid::Bid,
    cycle::Cycle,
    quote::QuoteProvider,
    window::{Timing, Window},
};
