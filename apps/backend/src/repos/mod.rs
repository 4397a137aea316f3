//! Repository functions for the domain layer (generic over ConnectionTrait).

pub mod levels;
pub mod scores;
