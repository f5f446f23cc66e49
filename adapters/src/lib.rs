pub mod algod;
pub mod algorand;
pub mod algorand_parser;
pub mod error;
pub mod indexer;
