pub mod refresh;

pub use refresh::RefreshUseCase;
