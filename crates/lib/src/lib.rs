//! liftbot core library — config, LINE channel, OpenAI client, router, and gateway
//! used by the liftbot CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod router;
