// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Useful things that don't have anything to do with digital audio.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        file_name, matching_files, natural_sort, subdirectories, ChannelPair, FilePattern,
        NaturalSortKey, ToggleSet,
    };
}

pub use channel_pair::ChannelPair;
pub use files::{
    file_name, matching_files, natural_sort, subdirectories, FilePattern, NaturalSortKey,
    SortPart,
};
pub use toggles::ToggleSet;

mod channel_pair;
mod files;
mod toggles;
