pub mod code_generator;
pub mod counter;
pub mod delay;
pub mod lock;
pub mod process;
pub mod random;
pub mod time;

pub use code_generator::CodeGenerator;
pub use counter::Counter;
pub use delay::{Delay, TokioDelay};
pub use lock::{KeyedLock, LockError};
pub use process::{shutdown_signal, Environment, EnvironmentError};
pub use random::{Random, ThreadRandom};
pub use time::{Clock, SystemClock};
