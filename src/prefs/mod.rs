pub mod preference_store;
