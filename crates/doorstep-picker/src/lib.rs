pub mod address_book;
pub mod auth;
pub mod debounce;
pub mod error;
pub mod location;
pub mod position;
pub mod workflow;

pub use address_book::AddressBook;
pub use auth::{AuthError, StubAuthenticator, User};
pub use error::{GeolocationError, PickerError};
pub use location::LocationController;
pub use position::{DeniedPosition, FixedPosition, PositionSource};
pub use workflow::{
    spawn_picker, FormSnapshot, PickerHandle, PickerOptions, PickerSnapshot, ResolutionPhase,
};
