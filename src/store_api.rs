use crate::ClientError;
use crate::client::{ResourceClient, ResourceId};
use crate::models::{ApiResponse, Inventory, Order, decode, encode};
use crate::transport::{HttpTransport, Transport};

const ORDER_ENDPOINT: &str = "store/order";
const INVENTORY_ENDPOINT: &str = "store/inventory";

/// Typed calls against the `/store` resources.
#[derive(Clone, Debug)]
pub struct StoreApi<T = HttpTransport> {
    client: ResourceClient<T>,
}

impl StoreApi {
    /// Creates an API over a default [`ResourceClient`] for `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self::from_client(ResourceClient::new(base_url)?))
    }
}

impl<T: Transport> StoreApi<T> {
    /// Wraps an already configured client.
    pub fn from_client(client: ResourceClient<T>) -> Self {
        Self { client }
    }

    /// Returns the underlying resource client.
    pub fn client(&self) -> &ResourceClient<T> {
        &self.client
    }

    /// `POST /store/order`
    pub fn create_order(&self, order: &Order) -> Result<Order, ClientError> {
        decode(self.client.post(ORDER_ENDPOINT, None, Some(encode(order)?))?)
    }

    /// `GET /store/order/{id}`
    pub fn get_order(&self, order_id: i64) -> Result<Order, ClientError> {
        decode(
            self.client
                .get(ORDER_ENDPOINT, Some(ResourceId::Number(order_id)))?,
        )
    }

    /// `DELETE /store/order/{id}`
    pub fn delete_order(&self, order_id: i64) -> Result<ApiResponse, ClientError> {
        decode(self.client.delete(ORDER_ENDPOINT, order_id)?)
    }

    /// `GET /store/inventory`
    pub fn get_inventory(&self) -> Result<Inventory, ClientError> {
        decode(self.client.get(INVENTORY_ENDPOINT, None)?)
    }
}
