// src/handlers.rs
use crate::{AppState, errors::SkinsightError, models::*};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use log::warn;
use uuid::Uuid;

fn user_or_default(user: &Option<String>) -> String {
    user.clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "local".to_string())
}

pub async fn analyze_skin(
    body: web::Json<AnalyzeRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = user_or_default(&body.user);

    // Image validation happens before any network or state work.
    let prepared = data.image_processor.prepare(&body.image)?;

    let pending = AnalysisState::start(Utc::now());
    data.redis_service.store_state(&user, &pending).await?;

    // Both arms record a terminal state; the client is never left watching
    // a pending analysis that already finished.
    match data.analysis_service.analyze_skin(&prepared).await {
        Ok(analysis) => {
            let done = pending.succeed(Utc::now(), analysis.health_score);
            if let Err(e) = data.redis_service.store_state(&user, &done).await {
                warn!("failed to record analysis state for {}: {}", user, e);
            }
            data.redis_service
                .store_current_analysis(&user, &analysis)
                .await?;
            Ok(HttpResponse::Ok().json(&analysis))
        }
        Err(e) => {
            let failed = pending.fail(e.user_message());
            if let Err(state_err) = data.redis_service.store_state(&user, &failed).await {
                warn!("failed to record analysis state for {}: {}", user, state_err);
            }
            Err(e)
        }
    }
}

pub async fn analyze_products(
    body: web::Json<AnalyzeRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let prepared = data.image_processor.prepare(&body.image)?;
    let analysis = data.analysis_service.analyze_products(&prepared).await?;
    Ok(HttpResponse::Ok().json(&analysis))
}

pub async fn action_plan(
    body: web::Json<ActionPlanRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = user_or_default(&body.user);
    let prepared = data.image_processor.prepare(&body.image)?;

    let analysis = match &body.analysis {
        Some(analysis) => analysis.clone(),
        None => data
            .redis_service
            .get_current_analysis(&user)
            .await?
            .ok_or_else(|| {
                SkinsightError::Validation(
                    "No skin analysis available. Please analyze a photo first.".to_string(),
                )
            })?,
    };

    // Infallible by contract: the service falls back to a locally built plan.
    let plan = data.analysis_service.action_plan(&prepared, &analysis).await;
    Ok(HttpResponse::Ok().json(&plan))
}

pub async fn get_current_analysis(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();

    match data.redis_service.get_current_analysis(&user).await? {
        Some(analysis) => Ok(HttpResponse::Ok().json(&analysis)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": "No analysis stored for this user yet."
        }))),
    }
}

pub async fn get_analysis_state(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    let state = data.redis_service.get_state(&user).await?;
    Ok(HttpResponse::Ok().json(&state))
}

pub async fn save_scan(
    path: web::Path<String>,
    body: web::Json<SkinAnalysis>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    let scan = SavedScan {
        id: Uuid::new_v4(),
        saved_at: Utc::now(),
        analysis: body.into_inner(),
    };

    data.redis_service.save_scan(&user, &scan).await?;

    // Profile sync is fire-and-forget: it never blocks or fails the save.
    let redis_service = data.redis_service.clone();
    let sync_user = user.clone();
    let sync_scan = scan.clone();
    tokio::spawn(async move {
        if let Err(e) = redis_service
            .record_profile_scan(&sync_user, &sync_scan)
            .await
        {
            warn!("profile scan sync failed for {}: {}", sync_user, e);
        }
    });

    Ok(HttpResponse::Ok().json(&scan))
}

pub async fn list_scans(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    let scans = data.redis_service.get_scans(&user).await?;
    Ok(HttpResponse::Ok().json(&scans))
}

pub async fn delete_scan(
    path: web::Path<(String, Uuid)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let (user, scan_id) = path.into_inner();

    if data.redis_service.delete_scan(&user, &scan_id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": "No saved scan with that id."
        })))
    }
}

pub async fn get_routines(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    match data.redis_service.get_routines(&user).await? {
        Some(routines) => Ok(HttpResponse::Ok().json(routines)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": "No routines stored for this user yet."
        }))),
    }
}

pub async fn put_routines(
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    data.redis_service.put_routines(&user, &body).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_profile(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    match data.redis_service.get_profile(&user).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": "No profile stored for this user yet."
        }))),
    }
}

pub async fn put_profile(
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SkinsightError> {
    let user = path.into_inner();
    data.redis_service.put_profile(&user, &body).await?;
    Ok(HttpResponse::NoContent().finish())
}
