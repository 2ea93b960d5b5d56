pub mod service;

pub use service::Rendezvous;
