use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::SeedableRng;
use crate::random::{RngData, RngHolder, RngId, RngPlugin};

impl RngData {
    /// Borrows the stream for `R`, seeding it on first use from the base seed and the hash of
    /// the stream name.
    fn stream<R: RngId + 'static>(&self) -> RefMut<'_, R::RngType> {
        let holders = self
            .rng_holders
            .try_borrow_mut()
            .expect("a sampler drew from a stream while another draw was in progress");
        RefMut::map(holders, |holders| {
            let holder = holders.entry(TypeId::of::<R>()).or_insert_with(|| {
                let seed = self.base_seed.wrapping_add(hash_str(R::get_name()));
                trace!("seeding stream {} with {seed}", R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(seed)),
                }
            });
            holder
                .rng
                .downcast_mut::<R::RngType>()
                .expect("streams are keyed by the type of their RngId")
        })
    }
}

/// Access to the named random streams of a `Context`.
pub trait ContextRandomExt {
    /// Sets the base seed and forgets every stream drawn so far, so the next draw from each
    /// stream starts over from the new seed.
    fn init_random(&mut self, base_seed: u64);

    /// Runs `sampler` on the stream named by `rng_id`.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` has not been called, or if `sampler` itself draws from a
    /// stream of the same context.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("base seed set to {base_seed}");
        let rng_data = self.get_data_container_mut(RngPlugin);
        rng_data.base_seed = base_seed;
        rng_data.rng_holders.get_mut().clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let rng_data = self
            .get_data_container(RngPlugin)
            .expect("You must initialize the random number generator with a base seed");
        sampler(&mut rng_data.stream::<R>())
    }
}
