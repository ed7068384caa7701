//! Named, independently seeded random number streams.
//!
//! Every stream is identified by a type declared with [`define_rng!`]. All streams derive their
//! seed from one base seed set with [`ContextRandomExt::init_random`] plus a stable hash of the
//! stream's name, so that drawing more from one stream never shifts another. A run is
//! reproducible as long as the base seed and the order of draws within each stream are fixed.
mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::hashing::HashMap;
use crate::rand::SeedableRng;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// Allows for any `SeedableRng` behind an `RngId`.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

// Registers a data container which stores:
// * base_seed: A base seed for all rngs
// * rng_holders: A map of rngs, keyed by their RngId. This is stored in a RefCell to allow a
//   mutable borrow of an rng without a mutable borrow of the Context itself.
crate::define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
    }
);
