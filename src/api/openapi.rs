use super::handlers::{admin, health, me, oauth, refresh, session, signout, token};
use crate::{
    refresh::RefreshResponse,
    session::{Flash, Role, UserIdentity},
};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        Contact, Info, InfoBuilder, License, OpenApi as OpenApiDoc,
    },
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        refresh::refresh,
        signout::signout,
        oauth::oauth42,
        session::session,
        me::me,
        admin::admin,
    ),
    components(schemas(
        health::Health,
        refresh::RefreshStatus,
        session::SessionSummary,
        Flash,
        Role,
        UserIdentity,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "session", description = "Browser session and access token renewal"),
    )
)]
struct WebDoc;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, token::refresh_token, token::logout),
    components(schemas(health::Health, RefreshResponse)),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Access token issuance"),
    )
)]
struct AuthDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut OpenApiDoc) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// `OpenAPI` document of the browser-facing gateway.
#[must_use]
pub fn web_openapi() -> OpenApiDoc {
    let mut doc = WebDoc::openapi();
    doc.info = cargo_info("web gateway");
    doc
}

/// `OpenAPI` document of the auth service.
#[must_use]
pub fn auth_openapi() -> OpenApiDoc {
    let mut doc = AuthDoc::openapi();
    doc.info = cargo_info("auth service");
    doc
}

fn cargo_info(service: &str) -> Info {
    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(format!("{} {service}", env!("CARGO_PKG_NAME")))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let Some(start) = author.find('<') else {
        let name = author.trim();
        return (if name.is_empty() { None } else { Some(name) }, None);
    };

    let name = author[..start].trim();
    let email = author[start + 1..].trim_end_matches('>').trim();
    (
        if name.is_empty() { None } else { Some(name) },
        if email.is_empty() { None } else { Some(email) },
    )
}
