//! The worker-side HTTP service.
//!
//! Binds a loopback port (negotiating past occupied ones), announces the
//! bound port with a single sentinel line on stdout, then serves the
//! now-playing JSON endpoint, the artwork file, and the overlay's static
//! assets.

pub mod assets;
pub mod negotiate;
pub mod router;
pub mod serve;

pub use assets::*;
pub use negotiate::*;
pub use router::*;
pub use serve::*;
