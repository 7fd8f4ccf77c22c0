//! Schema-driven REST gateways.
//!
//! The server publishes a model specification; this crate turns it into one
//! [`ModelGateway`] per model type, each able to address its records under
//! their parent and to create, read, update and delete them.
//!
//! # Usage
//!
//! ```ignore
//! use modelgate::{HttpTransport, NoAuth, Session};
//!
//! let transport = Arc::new(HttpTransport::new("http://localhost:8080", Arc::new(NoAuth)));
//! let session = Session::with_transport(transport);
//! let models = session.load().await?;
//!
//! let widgets = models.gateway_for("Widget").unwrap();
//! let mut w = widgets.new_instance();
//! w.set("label", "bolt")?;
//! widgets.post("42", &mut w).await?;  // POST /group/42/Widgets
//! ```

pub mod error;
pub mod factory;
pub mod gateway;
pub mod instance;
pub mod loader;
pub mod ready;
pub mod session;
pub mod spec;
pub mod transport;

pub use error::{FieldError, RequestError, SessionError, SpecError, SpecParseError, TransportError};
pub use factory::ModelFactory;
pub use gateway::{Envelope, Method, ModelGateway};
pub use instance::{InstanceState, ModelInstance};
pub use loader::SpecLoader;
pub use ready::ReadyBarrier;
pub use session::Session;
pub use spec::{EntityDescriptor, FieldDef, SpecFormat, Specification};
pub use transport::{HttpTransport, NoAuth, StaticToken, TextResponse, TokenSource, Transport};
