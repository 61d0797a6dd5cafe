use std::sync::Arc;

use sift_service::SiftService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub fn new(config: sift_config::Config) -> color_eyre::Result<Self> {
		let service = SiftService::new(config)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: SiftService) -> Self {
		Self { service: Arc::new(service) }
	}
}
