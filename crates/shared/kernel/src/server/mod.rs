mod health;
mod router;

pub use router::system_router;
