// Router for compiler related endpoints
use crate::engine::Workspace;
use crate::engine::params;
use crate::engine::presets::ModelTemplate;
use crate::engine::types::{ActivationType, DatasetDescriptor, LayerKind, LossType, OptimizerType};
use crate::http::{AppState, error::Error as HTTPError};
use crate::schemas::graph::{
    GenerateRequest, GenerateResponse, ShapesRequest, ShapesResponse, TemplateQuery,
    TemplateResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{Router, get, post},
};
use schemars::schema_for;
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/compiler/layer-types", get(get_layer_types))
        .route("/compiler/activation-types", get(get_activation_types))
        .route("/compiler/optimizer-types", get(get_optimizer_types))
        .route("/compiler/loss-types", get(get_loss_types))
        .route("/compiler/dataset-types", get(get_dataset_types))
        .route("/compiler/template-types", get(get_template_types))
        .route("/compiler/parameter-schema", get(get_parameter_schema))
        .route("/compiler/templates/{name}", get(get_template))
        .route("/compiler/shapes", post(post_shapes))
        .route("/compiler/generate", post(post_generate))
        .with_state(state)
}

fn resolve_dataset(
    state: &AppState,
    requested: Option<DatasetDescriptor>,
) -> Result<DatasetDescriptor, HTTPError> {
    if let Some(dataset) = requested {
        dataset.validate().map_err(HTTPError::BadRequest)?;
        return Ok(dataset);
    }
    preset(&state.config.default_dataset)
}

fn preset(name: &str) -> Result<DatasetDescriptor, HTTPError> {
    DatasetDescriptor::preset(name)
        .ok_or_else(|| HTTPError::BadRequest(format!("unknown dataset `{}`", name)))
}

async fn get_layer_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching layer types");
    let layer_types = schema_for!(LayerKind);
    Ok((StatusCode::OK, Json(layer_types)))
}

async fn get_activation_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching activation types");
    let activation_types = schema_for!(ActivationType);
    Ok((StatusCode::OK, Json(activation_types)))
}

async fn get_optimizer_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching optimizer types");
    let optimizer_types = schema_for!(OptimizerType);
    Ok((StatusCode::OK, Json(optimizer_types)))
}

async fn get_loss_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching loss types");
    let loss_types = schema_for!(LossType);
    Ok((StatusCode::OK, Json(loss_types)))
}

async fn get_dataset_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching dataset types");
    let dataset_types = schema_for!(DatasetDescriptor);
    Ok((StatusCode::OK, Json(dataset_types)))
}

async fn get_template_types() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching template types");
    let template_types = schema_for!(ModelTemplate);
    Ok((StatusCode::OK, Json(template_types)))
}

async fn get_parameter_schema() -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Fetching parameter schema");
    let schema: BTreeMap<&str, &[params::ParamSpec]> = LayerKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), params::schema(*kind)))
        .collect();
    Ok((StatusCode::OK, Json(schema)))
}

async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<TemplateQuery>,
) -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Loading template {}", name);
    let template: ModelTemplate = name.parse()?;
    let dataset = preset(query.dataset.as_deref().unwrap_or(&state.config.default_dataset))?;

    let mut workspace = Workspace::new(dataset);
    workspace.load_template(template)?;

    let response = TemplateResponse {
        snapshot: workspace.snapshot(),
        dataset: workspace.dataset,
        hyperparameters: workspace.hyperparameters,
    };
    Ok((StatusCode::OK, Json(response)))
}

async fn post_shapes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShapesRequest>,
) -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Inferring shapes for {} nodes", request.snapshot.nodes.len());
    let mut workspace = Workspace::new(resolve_dataset(&state, request.dataset)?);
    workspace.load_snapshot(&request.snapshot)?;

    let report = workspace.report().clone();
    let response = ShapesResponse {
        order: workspace.order().to_vec(),
        shapes: report.shapes,
        violations: report.violations,
    };
    Ok((StatusCode::OK, Json(response)))
}

async fn post_generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<impl IntoResponse, HTTPError> {
    log::debug!("Generating code for {} nodes", request.snapshot.nodes.len());
    let mut workspace = Workspace::new(resolve_dataset(&state, request.dataset)?);
    workspace.hyperparameters = request.hyperparameters;
    workspace.load_snapshot(&request.snapshot)?;

    let code = workspace.export_code()?;
    Ok((StatusCode::OK, Json(GenerateResponse { code })))
}
