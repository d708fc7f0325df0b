pub mod lexer;
pub mod duration;
pub mod annotate;
pub mod mutator;
pub mod structured;
pub mod change;
pub mod debounce;
pub mod scheduler;
pub mod conductor;

pub use lexer::*;
pub use duration::*;
pub use annotate::*;
pub use mutator::*;
pub use structured::*;
pub use change::*;
pub use debounce::*;
pub use scheduler::*;
pub use conductor::*;

#[cfg(test)]
mod tests;
