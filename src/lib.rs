pub mod extract;
pub mod fetch;
pub mod order;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod source;
