pub mod strategy;

pub use strategy::{
    score_hint, select_keyword, select_recent, MatchResult, MatchStrategy, Matcher,
    ACCEPT_THRESHOLD,
};
