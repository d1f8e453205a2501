//! The favorite tracker (C7): one-identity-one-favorite semantics, plus
//! eager `favoritesCount` maintenance on add/remove.

pub mod tracker;

pub use tracker::FavoriteTracker;
