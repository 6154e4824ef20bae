//! `login`, `signup`, `logout`, `whoami` and `profile`.

use catering_client::services::{ProfileService, ProfileUpdate, SignUpForm};
use catering_client::{CateringClient, ClientError};
use secrecy::SecretString;

use super::{password_or_stdin, print_alert};

pub async fn login(
    client: &CateringClient,
    email: &str,
    password: Option<String>,
) -> Result<(), ClientError> {
    let password = password_or_stdin(password).await;
    let user = client.auth_flows().sign_in(email, &password).await?;
    println!("Signed in as {}", user.email.as_deref().unwrap_or(email));
    Ok(())
}

pub async fn signup(
    client: &CateringClient,
    full_name: String,
    email: String,
    phone: String,
    password: Option<String>,
) -> Result<(), ClientError> {
    let password = password_or_stdin(password).await;
    // The terminal has no second field; confirmation is the same input.
    let confirm_password: SecretString = password.clone();
    let form = SignUpForm {
        full_name,
        email,
        phone,
        password,
        confirm_password,
    };
    let result = client.auth_flows().sign_up(&form).await?;
    print_alert(&result.alert());
    if !result.signed_in {
        println!("Check your inbox to confirm the email address before signing in.");
    }
    Ok(())
}

pub async fn logout(client: &CateringClient) {
    client.auth_flows().sign_out().await;
    println!("Signed out");
}

pub fn whoami(client: &CateringClient) {
    match client.session().current_user() {
        Some(user) => println!(
            "{} ({})",
            user.email.as_deref().unwrap_or("-"),
            user.id
        ),
        None => println!("Not signed in"),
    }
}

pub async fn show_profile(client: &CateringClient) -> Result<(), ClientError> {
    let profile = client.profile().fetch().await?;
    println!("Nama    : {}", profile.full_name.as_deref().unwrap_or("-"));
    println!("Telepon : {}", profile.phone.as_deref().unwrap_or("-"));
    Ok(())
}

pub async fn update_profile(
    client: &CateringClient,
    full_name: String,
    phone: String,
) -> Result<(), ClientError> {
    client
        .profile()
        .update(&ProfileUpdate { full_name, phone })
        .await?;
    print_alert(&ProfileService::success_alert());
    Ok(())
}
