//! Two-tier route table: exact locations first, then prefixes in
//! registration order

use crate::endpoint::{Endpoint, MatchKind};
use crate::error::{RouteError, RouteResult};
use http::Method;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Outcome of resolving a path and method
#[derive(Debug, Clone)]
pub enum Resolution {
    Endpoint(Arc<Endpoint>),
    /// A location matched but not the method; methods in registration order
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Endpoints registered on one location, in registration order
#[derive(Debug, Default)]
struct MethodMap {
    endpoints: Vec<Arc<Endpoint>>,
    restricted: bool,
}

impl MethodMap {
    fn get(&self, method: &Method) -> Option<&Arc<Endpoint>> {
        self.endpoints.iter().find(|e| e.method == *method)
    }

    fn methods(&self) -> Vec<Method> {
        self.endpoints.iter().map(|e| e.method.clone()).collect()
    }

    fn add(&mut self, endpoint: Endpoint) -> RouteResult<()> {
        if self.get(&endpoint.method).is_some() {
            return Err(RouteError::Registration(format!(
                "{:?} endpoint {} {} is already registered",
                endpoint.kind, endpoint.method, endpoint.location
            )));
        }
        self.restricted |= endpoint.disallow_other_methods;
        self.endpoints.push(Arc::new(endpoint));
        Ok(())
    }
}

/// Location/method registry
#[derive(Debug, Default)]
pub struct RouteTable {
    exact: HashMap<String, MethodMap>,
    prefixes: Vec<(String, MethodMap)>,
    /// Exact locations registered with `disallow_other_methods`
    restricted: HashSet<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, endpoint: Endpoint) -> RouteResult<()> {
        if endpoint.location.is_empty() {
            return Err(RouteError::Registration("Location must not be empty".to_string()));
        }

        match endpoint.kind {
            MatchKind::Exact => {
                let location = endpoint.location.clone();
                let restricted = endpoint.disallow_other_methods;
                self.exact.entry(location.clone()).or_default().add(endpoint)?;
                if restricted {
                    self.restricted.insert(location);
                }
            }
            MatchKind::Prefix => {
                match self
                    .prefixes
                    .iter_mut()
                    .find(|(location, _)| *location == endpoint.location)
                {
                    Some((_, methods)) => methods.add(endpoint)?,
                    None => {
                        let mut methods = MethodMap::default();
                        let location = endpoint.location.clone();
                        methods.add(endpoint)?;
                        self.prefixes.push((location, methods));
                    }
                }
            }
        }
        Ok(())
    }

    /// Find the endpoint for `path` and `method`.
    ///
    /// An exact location wins over every prefix. When the exact location
    /// exists under other methods only, the prefixes still get a chance;
    /// if none accepts the method the result is `MethodNotAllowed` with the
    /// exact location's methods. A prefix that matches the path but not the
    /// method is skipped, unless it was registered with
    /// `disallow_other_methods`.
    pub fn resolve(&self, path: &str, method: &Method) -> Resolution {
        let mut exact_mismatch: Option<Vec<Method>> = None;

        if let Some(methods) = self.exact.get(path) {
            if let Some(endpoint) = methods.get(method) {
                debug!(%path, %method, "Resolved exact endpoint");
                return Resolution::Endpoint(Arc::clone(endpoint));
            }
            if self.restricted.contains(path) {
                debug!(%path, %method, "Method rejected by restricted exact location");
                return Resolution::MethodNotAllowed(methods.methods());
            }
            exact_mismatch = Some(methods.methods());
        }

        for (location, methods) in &self.prefixes {
            if !path.starts_with(location.as_str()) {
                continue;
            }
            if let Some(endpoint) = methods.get(method) {
                debug!(%path, %method, prefix = %location, "Resolved prefix endpoint");
                return Resolution::Endpoint(Arc::clone(endpoint));
            }
            if methods.restricted {
                debug!(%path, %method, prefix = %location, "Method rejected by restricted prefix");
                let allowed = exact_mismatch.unwrap_or_else(|| methods.methods());
                return Resolution::MethodNotAllowed(allowed);
            }
        }

        match exact_mismatch {
            Some(allowed) => {
                debug!(%path, %method, "Method not allowed");
                Resolution::MethodNotAllowed(allowed)
            }
            None => {
                debug!(%path, %method, "No endpoint found");
                Resolution::NotFound
            }
        }
    }
}
