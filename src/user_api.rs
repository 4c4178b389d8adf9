use crate::ClientError;
use crate::client::ResourceClient;
use crate::models::{ApiResponse, User, decode, encode};
use crate::transport::{HttpTransport, Transport};

const USER_ENDPOINT: &str = "user";

/// Typed calls against the `/user` resource.
#[derive(Clone, Debug)]
pub struct UserApi<T = HttpTransport> {
    client: ResourceClient<T>,
}

impl UserApi {
    /// Creates an API over a default [`ResourceClient`] for `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self::from_client(ResourceClient::new(base_url)?))
    }
}

impl<T: Transport> UserApi<T> {
    /// Wraps an already configured client.
    pub fn from_client(client: ResourceClient<T>) -> Self {
        Self { client }
    }

    /// Returns the underlying resource client.
    pub fn client(&self) -> &ResourceClient<T> {
        &self.client
    }

    /// `POST /user`
    pub fn create_user(&self, user: &User) -> Result<ApiResponse, ClientError> {
        decode(self.client.post(USER_ENDPOINT, None, Some(encode(user)?))?)
    }

    /// `GET /user/{username}`
    pub fn get_user(&self, username: &str) -> Result<User, ClientError> {
        decode(self.client.get(USER_ENDPOINT, Some(username.into()))?)
    }

    /// `POST /user/{username}`
    pub fn update_user(&self, username: &str, user: &User) -> Result<ApiResponse, ClientError> {
        decode(
            self.client
                .post(USER_ENDPOINT, Some(username.into()), Some(encode(user)?))?,
        )
    }

    /// `DELETE /user/{username}`
    pub fn delete_user(&self, username: &str) -> Result<ApiResponse, ClientError> {
        decode(self.client.delete(USER_ENDPOINT, username)?)
    }
}
