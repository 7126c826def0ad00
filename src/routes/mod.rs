mod about;
mod auth;
mod awards;
mod contacts;
mod contents;
mod events;
mod festivals;
mod galleries;
mod home;
mod products;
mod projects;
mod services;
mod talents;
mod users;
mod videos;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::openapi::path::{HttpMethod, OperationBuilder, Parameter, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::security::SecurityRequirement;
use utoipa::openapi::{Content, ObjectBuilder, Required, Response};
use utoipa::{IntoParams, OpenApi, PartialSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, MediaDriver};
use crate::i18n::LangQuery;
use crate::resource::{self, Resource};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        home::health,
        auth::login,
        auth::logout,
        auth::me,
        users::index,
        users::store,
        users::update,
        users::destroy,
        users::revoke_tokens,
        about::show,
        about::store,
        about::update,
        about::destroy,
        contents::show_by_slug,
        contacts::submit,
        contacts::index,
        contacts::show,
        contacts::update,
        contacts::destroy,
        talents::apply,
        talents::list_applications,
        talents::delete_application,
    ),
    components(
        schemas(
            home::HealthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MessageResponse,
            auth::UserResponse,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            crate::entities::contact_message::Model,
            crate::entities::event::EventType,
            crate::entities::talent::TalentStatus,
            crate::entities::video::SourceKind,
            crate::i18n::Lang,
        )
    ),
    tags(
        (name = "General", description = "Landing page and health"),
        (name = "Authentication", description = "Bearer token login, logout and identity"),
        (name = "Users", description = "Account administration (users.manage)"),
        (name = "About", description = "About page, one per language"),
        (name = "Contents", description = "Free-form page content by type, slug and language"),
        (name = "Contact", description = "Contact form inbox"),
    ),
    info(
        title = "Folio CMS API",
        version = "0.1.0",
        description = "Multilingual (en, am, or) content API with managed media and role-based access control",
    ),
    modifiers(&SecurityAddon, &ResourcePaths)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

/// A content type served through the generic resource endpoints: how to
/// route it and how to document it.
struct ResourceEntry {
    routes: fn() -> Router<AppState>,
    document: fn(&mut utoipa::openapi::OpenApi),
}

fn entry<R: Resource>() -> ResourceEntry {
    ResourceEntry {
        routes: resource::routes::<R>,
        document: document::<R>,
    }
}

fn resources() -> [ResourceEntry; 10] {
    [
        entry::<events::Events>(),
        entry::<festivals::Festivals>(),
        entry::<galleries::Galleries>(),
        entry::<projects::Projects>(),
        entry::<services::Services>(),
        entry::<products::Products>(),
        entry::<talents::Talents>(),
        entry::<awards::Awards>(),
        entry::<videos::Videos>(),
        entry::<contents::Contents>(),
    ]
}

struct ResourcePaths;

impl utoipa::Modify for ResourcePaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        for entry in resources() {
            (entry.document)(openapi);
        }
    }
}

fn query_params<R: Resource>() -> Vec<Parameter> {
    let mut params = LangQuery::into_params(|| Some(ParameterIn::Query));
    for param in R::Filter::into_params(|| Some(ParameterIn::Query)) {
        if !params.iter().any(|p| p.name == param.name) {
            params.push(param);
        }
    }
    params
}

fn id_param() -> Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(i32::schema()))
        .build()
}

fn document<R: Resource>(openapi: &mut utoipa::openapi::OpenApi) {
    let collection = R::PATH;
    let member = format!("{}/{{id}}", R::PATH);
    let slug = R::PATH.trim_start_matches('/').replace('-', "_");
    let bearer = || SecurityRequirement::new("bearer_auth", Vec::<String>::new());
    let payload = || {
        let content = || Content::new(Some(ObjectBuilder::new()));
        RequestBodyBuilder::new()
            .description(Some(format!(
                "{} fields; localized fields are sent as `<field>_en`, `<field>_am` and `<field>_or`",
                R::NAME
            )))
            .content("multipart/form-data", content())
            .content("application/json", content())
            .build()
    };
    let tagged = |summary: String, id: String| {
        OperationBuilder::new()
            .tag(R::TAG)
            .summary(Some(summary))
            .operation_id(Some(id))
    };
    let paths = &mut openapi.paths;

    paths.add_path_operation(
        collection,
        vec![HttpMethod::Get],
        tagged(format!("List {} records in one language", R::NAME), format!("list_{slug}"))
            .parameters(Some(query_params::<R>()))
            .response("200", Response::new("Records projected to the requested language"))
            .response("422", Response::new("Unknown language")),
    );
    paths.add_path_operation(
        collection,
        vec![HttpMethod::Post],
        tagged(format!("Create a {}", R::NAME), format!("create_{slug}"))
            .request_body(Some(payload()))
            .security(bearer())
            .response("201", Response::new("Created; all languages"))
            .response("401", Response::new("Unauthenticated"))
            .response("403", Response::new("Missing permission"))
            .response("422", Response::new("Invalid payload")),
    );
    paths.add_path_operation(
        &member,
        vec![HttpMethod::Get],
        tagged(format!("Show a {} in all languages", R::NAME), format!("show_{slug}"))
            .parameter(id_param())
            .response("200", Response::new("Record with every language"))
            .response("404", Response::new("Not found")),
    );
    paths.add_path_operation(
        &member,
        vec![HttpMethod::Put, HttpMethod::Patch],
        tagged(format!("Update a {}", R::NAME), format!("update_{slug}"))
            .parameter(id_param())
            .request_body(Some(payload()))
            .security(bearer())
            .response("200", Response::new("Updated; all languages"))
            .response("404", Response::new("Not found"))
            .response("422", Response::new("Invalid payload")),
    );
    paths.add_path_operation(
        &member,
        vec![HttpMethod::Delete],
        tagged(format!("Delete a {} and its media", R::NAME), format!("delete_{slug}"))
            .parameter(id_param())
            .security(bearer())
            .response("200", Response::new("Deleted"))
            .response("404", Response::new("Not found")),
    );
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let mut api = Router::new()
        .route("/", get(home::root))
        .route("/health", get(home::health))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(about::routes())
        .merge(contents::slug_routes())
        .merge(contacts::routes())
        .merge(talents::application_routes());
    for entry in resources() {
        api = api.merge((entry.routes)());
    }

    if let MediaDriver::Local { root } = &state.config.media {
        api = api.nest_service("/storage", ServeDir::new(root));
    }

    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(swagger_router)
        .merge(api.with_state(state))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_resources_are_documented() {
        let doc = ApiDoc::openapi();
        let events = doc.paths.paths.get("/events").expect("events collection");
        assert!(events.get.is_some() && events.post.is_some());

        let member = doc.paths.paths.get("/events/{id}").expect("event member");
        assert!(member.put.is_some() && member.patch.is_some() && member.delete.is_some());

        let params = events.get.as_ref().unwrap().parameters.as_ref().unwrap();
        assert!(params.iter().any(|p| p.name == "lang"));
        assert!(params.iter().any(|p| p.name == "type"));
    }

    #[test]
    fn lang_is_documented_once_for_contents() {
        let doc = ApiDoc::openapi();
        let contents = doc.paths.paths.get("/contents").unwrap();
        let params = contents.get.as_ref().unwrap().parameters.as_ref().unwrap();
        assert_eq!(params.iter().filter(|p| p.name == "lang").count(), 1);
    }
}
