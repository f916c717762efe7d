use std::sync::Arc;

use crate::application::crud::CrudService;
use crate::domain::Resource;

use super::views::View;

/// Per-resource handler state.
pub struct ResourceState<R: Resource> {
    pub service: Arc<CrudService<R>>,
    pub view: View,
}

impl<R: Resource> ResourceState<R> {
    pub fn new(service: Arc<CrudService<R>>, view: View) -> Self {
        Self { service, view }
    }
}

impl<R: Resource> Clone for ResourceState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            view: self.view,
        }
    }
}

/// State for the API-key gate.
#[derive(Clone)]
pub struct ApiKeyState {
    pub key: Arc<str>,
    pub view: View,
}
