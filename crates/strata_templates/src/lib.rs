//! # strata_templates
//!
//! Environment/version document resolution for Strata.
//!
//! Infrastructure documents live under `{environment}/{version}/...`. A
//! [`TemplateRequest`] names one of them, the [`TemplateResolver`] finds it
//! through a [`Loader`], layers the request overrides over the
//! [`VariableContext`] defaults, and renders the mustache placeholders.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_templates::{
//!     Environment, MemoryLoader, Scope, TemplateRequest, TemplateResolver, VariableContext, Version,
//! };
//!
//! let loader = MemoryLoader::new().with_document("prototype/v1/queue.yaml", "name: {{hosted:id}}-events");
//! let resolver = TemplateResolver::new(Arc::new(loader));
//!
//! let context = VariableContext::new(
//!     Scope::default(),
//!     Scope { id: Some("shop".to_string()), ..Scope::default() },
//! );
//! let request = TemplateRequest::new(Environment::Prototype, Version::V1, "queue.yaml");
//!
//! let document = resolver.resolve(&request, &context).unwrap();
//! assert_eq!(document.text, "name: shop-events");
//! ```

pub mod context;
pub mod error;
pub mod loader;
pub mod renderer;
pub mod resolver;

pub use context::{merge, merge_all, Environment, Scope, VariableContext, Variables, Version};
pub use error::{TemplateError, TemplateResult};
pub use loader::{FsLoader, Loader, MemoryLoader};
pub use renderer::TemplateRenderer;
pub use resolver::{ResolvedDocument, TemplateRequest, TemplateResolver};
