//! 원시 메트릭 페이로드 정규화.
//!
//! 업스트림 생산자마다 필드 이름 규칙이 달라서 필드마다 두 이름을 허용한다.
//! 아래 표의 왼쪽 이름을 먼저 보고, 비어 있으면 오른쪽 이름을 본다.
//! "비어 있음"은 누락, `null`, `""`, 빈 배열, 빈 객체를 뜻한다.
//!
//! | 필드 | 우선 | 대체 | 기본값 |
//! |---|---|---|---|
//! | user_id | `user_id` | `userId` | (필수) |
//! | user_name | `name` | `userName` | user_id |
//! | session_duration | `session_time_minutes` | `sessionDuration` | 0 |
//! | page_views | `pages_viewed` | `pageViews` | 0 |
//! | click_count | `total_clicks` | `clickCount` | 0 |
//! | scroll_depth | `scroll_percentage` | `scrollDepth` | 0 (0-100으로 제한) |
//! | features_used | `features_accessed` | `featuresUsed` | [] |
//! | active_feature | `current_feature` | `activeFeature` | `"Dashboard"` |
//! | feature_time | `time_per_feature` | `featureTime` | {} |
//! | events_triggered | `events_count` | `eventsTriggered` | 0 |
//! | queries_run | `queries_executed` | `queriesRun` | 0 |
//! | reports_created | `reports_generated` | `reportsCreated` | 0 |
//! | dashboards_viewed | `dashboards_accessed` | `dashboardsViewed` | 0 |
//! | is_active | `is_currently_active` | `isActive` | true |
//! | last_action | `last_action` | `lastAction` | `"Page view"` |
//! | last_action_time | `last_action_timestamp` | `lastActionTime` | 현재 시각 |
//! | timestamp | `timestamp` | - | 현재 시각 |
//!
//! `email`, `company`는 단일 이름만 사용한다.
//! 시각은 RFC3339 문자열 또는 epoch 밀리초 숫자를 받는다.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::models::metric::UserMetric;

/// `current_feature|activeFeature`가 비어 있을 때의 기본값
pub const DEFAULT_ACTIVE_FEATURE: &str = "Dashboard";

/// `last_action|lastAction`이 비어 있을 때의 기본값
pub const DEFAULT_LAST_ACTION: &str = "Page view";

const USER_ID: &[&str] = &["user_id", "userId"];
const USER_NAME: &[&str] = &["name", "userName"];
const SESSION_DURATION: &[&str] = &["session_time_minutes", "sessionDuration"];
const PAGE_VIEWS: &[&str] = &["pages_viewed", "pageViews"];
const CLICK_COUNT: &[&str] = &["total_clicks", "clickCount"];
const SCROLL_DEPTH: &[&str] = &["scroll_percentage", "scrollDepth"];
const FEATURES_USED: &[&str] = &["features_accessed", "featuresUsed"];
const ACTIVE_FEATURE: &[&str] = &["current_feature", "activeFeature"];
const FEATURE_TIME: &[&str] = &["time_per_feature", "featureTime"];
const EVENTS_TRIGGERED: &[&str] = &["events_count", "eventsTriggered"];
const QUERIES_RUN: &[&str] = &["queries_executed", "queriesRun"];
const REPORTS_CREATED: &[&str] = &["reports_generated", "reportsCreated"];
const DASHBOARDS_VIEWED: &[&str] = &["dashboards_accessed", "dashboardsViewed"];
const IS_ACTIVE: &[&str] = &["is_currently_active", "isActive"];
const LAST_ACTION: &[&str] = &["last_action", "lastAction"];
const LAST_ACTION_TIME: &[&str] = &["last_action_timestamp", "lastActionTime"];
const TIMESTAMP: &[&str] = &["timestamp"];
const EMAIL: &[&str] = &["email"];
const COMPANY: &[&str] = &["company"];

/// 원시 페이로드 하나를 [`UserMetric`]으로 정규화 (기본 시각 = 현재)
pub fn normalize_metric(raw: &Value) -> Result<UserMetric, CoreError> {
    normalize_metric_at(raw, Utc::now())
}

/// 원시 페이로드 묶음 정규화
///
/// 하나라도 실패하면 전체를 거부한다. 에러 필드명에 배열 인덱스가 붙는다.
pub fn normalize_bulk(raws: &[Value]) -> Result<Vec<UserMetric>, CoreError> {
    let now = Utc::now();
    raws.iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_metric_at(raw, now).map_err(|e| match e {
                CoreError::Validation { field, message } => CoreError::Validation {
                    field: format!("metrics[{index}].{field}"),
                    message,
                },
                other => other,
            })
        })
        .collect()
}

/// 기본 시각을 지정하여 정규화
pub fn normalize_metric_at(raw: &Value, now: DateTime<Utc>) -> Result<UserMetric, CoreError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| CoreError::validation("metric", "JSON 객체가 아님"))?;

    let user_id = read_user_id(obj)?;
    let user_name = read_string(obj, USER_NAME)?.unwrap_or_else(|| user_id.clone());

    Ok(UserMetric {
        email: read_string(obj, EMAIL)?,
        company: read_string(obj, COMPANY)?,
        session_duration: read_f64(obj, SESSION_DURATION)?.unwrap_or(0.0),
        page_views: read_u64(obj, PAGE_VIEWS)?.unwrap_or(0),
        click_count: read_u64(obj, CLICK_COUNT)?.unwrap_or(0),
        scroll_depth: read_f64(obj, SCROLL_DEPTH)?
            .unwrap_or(0.0)
            .clamp(0.0, 100.0),
        features_used: read_string_set(obj, FEATURES_USED)?,
        active_feature: read_string(obj, ACTIVE_FEATURE)?
            .unwrap_or_else(|| DEFAULT_ACTIVE_FEATURE.to_string()),
        feature_time: read_feature_time(obj, FEATURE_TIME)?,
        events_triggered: read_u64(obj, EVENTS_TRIGGERED)?.unwrap_or(0),
        queries_run: read_u64(obj, QUERIES_RUN)?.unwrap_or(0),
        reports_created: read_u64(obj, REPORTS_CREATED)?.unwrap_or(0),
        dashboards_viewed: read_u64(obj, DASHBOARDS_VIEWED)?.unwrap_or(0),
        is_active: read_bool(obj, IS_ACTIVE)?.unwrap_or(true),
        last_action: read_string(obj, LAST_ACTION)?
            .unwrap_or_else(|| DEFAULT_LAST_ACTION.to_string()),
        last_action_time: read_timestamp(obj, LAST_ACTION_TIME)?.unwrap_or(now),
        timestamp: read_timestamp(obj, TIMESTAMP)?.unwrap_or(now),
        user_id,
        user_name,
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// 후보 이름 중 처음으로 비어 있지 않은 값
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !is_empty(v)).map(|v| (*key, v)))
}

fn read_user_id(obj: &Map<String, Value>) -> Result<String, CoreError> {
    match pick(obj, USER_ID) {
        Some((_, Value::String(s))) => Ok(s.clone()),
        Some((_, Value::Number(n))) => Ok(n.to_string()),
        Some((key, _)) => Err(CoreError::validation(key, "문자열 또는 숫자여야 함")),
        None => Err(CoreError::validation("userId", "필수 필드 누락")),
    }
}

fn read_string(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<Option<String>, CoreError> {
    match pick(obj, keys) {
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((key, _)) => Err(CoreError::validation(key, "문자열이어야 함")),
        None => Ok(None),
    }
}

/// 유한한 실수만 받는다. `"NaN"`, `"inf"` 같은 문자열은 거부.
fn read_f64(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<Option<f64>, CoreError> {
    let value = match pick(obj, keys) {
        Some((key, Value::Number(n))) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| CoreError::validation(key, "표현할 수 없는 숫자")),
        Some((key, Value::String(s))) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| CoreError::validation(key, format!("숫자가 아님: {s}"))),
        Some((key, _)) => Err(CoreError::validation(key, "숫자여야 함")),
        None => Ok(None),
    }?;

    match value {
        Some(v) if !v.is_finite() => {
            let key = pick(obj, keys).map(|(k, _)| k).unwrap_or(keys[0]);
            Err(CoreError::validation(key, "유한한 숫자여야 함"))
        }
        other => Ok(other),
    }
}

fn read_u64(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<Option<u64>, CoreError> {
    let Some(value) = read_f64(obj, keys)? else {
        return Ok(None);
    };
    if value.is_sign_negative() || !value.is_finite() {
        let key = pick(obj, keys).map(|(k, _)| k).unwrap_or(keys[0]);
        return Err(CoreError::validation(key, "0 이상의 정수여야 함"));
    }
    Ok(Some(value.round() as u64))
}

fn read_bool(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<Option<bool>, CoreError> {
    match pick(obj, keys) {
        Some((_, Value::Bool(b))) => Ok(Some(*b)),
        Some((key, Value::String(s))) => match s.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(CoreError::validation(key, format!("불리언이 아님: {s}"))),
        },
        Some((key, _)) => Err(CoreError::validation(key, "불리언이어야 함")),
        None => Ok(None),
    }
}

fn read_string_set(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<Vec<String>, CoreError> {
    let Some((key, value)) = pick(obj, keys) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| CoreError::validation(key, "문자열 배열이어야 함"))?;

    let mut features: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| CoreError::validation(key, "배열 원소는 문자열이어야 함"))?;
        if !features.iter().any(|f| f == name) {
            features.push(name.to_string());
        }
    }
    Ok(features)
}

fn read_feature_time(
    obj: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<BTreeMap<String, f64>, CoreError> {
    let Some((key, value)) = pick(obj, keys) else {
        return Ok(BTreeMap::new());
    };
    let entries = value
        .as_object()
        .ok_or_else(|| CoreError::validation(key, "기능 → 분 객체여야 함"))?;

    entries
        .iter()
        .map(|(feature, minutes)| {
            minutes
                .as_f64()
                .map(|m| (feature.clone(), m))
                .ok_or_else(|| CoreError::validation(format!("{key}.{feature}"), "숫자여야 함"))
        })
        .collect()
}

fn read_timestamp(
    obj: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<DateTime<Utc>>, CoreError> {
    match pick(obj, keys) {
        Some((key, Value::String(s))) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::validation(key, format!("RFC3339 시각 아님: {e}"))),
        Some((key, Value::Number(n))) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| CoreError::validation(key, "epoch 밀리초 범위 초과")),
        Some((key, _)) => Err(CoreError::validation(key, "시각 문자열 또는 숫자여야 함")),
        None => Ok(None),
    }
}
