pub mod abi;
pub mod callback;
pub mod envelope;
