pub mod composition_lock;
