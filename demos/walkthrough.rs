//! Create, read, update and delete a user, polling until the service
//! answers `200 OK`.
//!
//! Run:
//! `cargo run --example walkthrough`
//!
//! Optional env vars:
//! - `PETSTORE_BASE_URL` (defaults to the public pet-store service)
//! - `PETSTORE_USERNAME` (defaults to `johndoe`)

use petstore_client::{DEFAULT_BASE_URL, ResourceClient, RetryPolicy, User, UserApi};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url =
        std::env::var("PETSTORE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
    let username = std::env::var("PETSTORE_USERNAME").unwrap_or_else(|_| "johndoe".to_owned());

    let client = ResourceClient::new(base_url)?.with_retry_policy(RetryPolicy::until_ok(10)?);
    let users = UserApi::from_client(client);

    let mut user = User {
        first_name: Some("John".to_owned()),
        last_name: Some("Doe".to_owned()),
        email: Some(format!("{username}@example.com")),
        ..User::new(username.clone())
    };

    users.create_user(&user)?;
    let fetched = users.get_user(&username)?;
    println!("{}", serde_json::to_string_pretty(&fetched)?);

    user.first_name = Some("Jonathan".to_owned());
    users.update_user(&username, &user)?;
    users.delete_user(&username)?;
    Ok(())
}
