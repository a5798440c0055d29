pub mod key_lock;
