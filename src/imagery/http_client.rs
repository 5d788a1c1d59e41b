//! # JSON/HTTP imagery client
//!
//! [`HttpImageryClient`] implements [`ImageryClient`] against a project-scoped JSON API:
//!
//! | operation                | request                                       |
//! |--------------------------|-----------------------------------------------|
//! | scene search             | `POST …/v1/projects/{project}/scenes:search`   |
//! | band fetch               | `POST …/v1/projects/{project}/scenes/{id}:fetchBands` |
//! | canopy height reduction  | `POST …/v1/projects/{project}/canopyHeight:sample` |
//!
//! Every request goes through the [`RetryPolicy`] of the client. Transport failures, HTTP 429
//! and 5xx answers are retried; any other non-success status fails at once.
//!
//! Band values travel as `Vec<Option<f64>>` in row-major order; `null` samples become the
//! no-data value of the decoded [`Raster`].
use geo::{Coord, Rect};
use log::debug;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    constants::Meter,
    env_state::ImageryEnv,
    imagery::{
        retry::{AttemptError, RetryPolicy},
        DateRange, ImageryClient, SceneInfo,
    },
    raster::{BandStack, GeoTransform, Raster},
    treemetrics_errors::TreeMetricsError,
};

const FALLBACK_NODATA: f64 = -9999.0;

#[derive(Debug, Serialize)]
struct SearchRequest {
    /// `[west, south, east, north]`
    bounds: [f64; 4],
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    scenes: Vec<SceneInfo>,
}

#[derive(Debug, Serialize)]
struct FetchBandsRequest<'a> {
    bounds: [f64; 4],
    bands: &'a [&'a str],
    resolution_m: f64,
}

#[derive(Debug, Deserialize)]
struct BandPayload {
    name: String,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct FetchBandsResponse {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    #[serde(default)]
    nodata: Option<f64>,
    bands: Vec<BandPayload>,
}

impl FetchBandsResponse {
    fn into_band_stack(self) -> Result<BandStack, TreeMetricsError> {
        let transform = GeoTransform::from_gdal(self.geo_transform)?;
        let nodata = self.nodata.unwrap_or(FALLBACK_NODATA);
        let mut stack = BandStack::new();
        for band in self.bands {
            let data = band
                .values
                .into_iter()
                .map(|v| v.unwrap_or(nodata))
                .collect();
            let raster = Raster::new(self.width, self.height, transform, data, Some(nodata))?;
            stack.push(band.name, raster)?;
        }
        Ok(stack)
    }
}

#[derive(Debug, Serialize)]
struct SampleRequest<'a> {
    /// `[longitude, latitude]` pairs
    points: &'a [[f64; 2]],
    resolution_m: f64,
    reducer: &'static str,
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    values: Vec<Option<f64>>,
}

fn bounds_array(bounds: &Rect<f64>) -> [f64; 4] {
    [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y]
}

/// Sort a non-success HTTP status into a retryable or a fatal failure.
fn classify_status(status: StatusCode, body: &str, attempt: u32) -> AttemptError {
    let message = format!("HTTP {status}: {}", body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AttemptError::Transient(message)
    } else {
        AttemptError::Fatal(TreeMetricsError::RemoteQuery {
            attempts: attempt,
            message,
        })
    }
}

/// [`ImageryClient`] talking to the remote imagery service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageryClient {
    env: ImageryEnv,
    retry: RetryPolicy,
}

impl HttpImageryClient {
    pub fn new(env: ImageryEnv, retry: RetryPolicy) -> Self {
        HttpImageryClient { env, retry }
    }

    /// Client configured from the process environment (see [`ImageryEnv::from_env`]).
    pub fn from_env(retry: RetryPolicy) -> Result<Self, TreeMetricsError> {
        Ok(Self::new(ImageryEnv::from_env()?, retry))
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, TreeMetricsError> {
        let url = self.env.url(method);
        self.retry.run(method, |attempt| {
            debug!("POST {url} (attempt {attempt})");
            let response = self
                .env
                .http_client
                .post(&url)
                .json(body)
                .send()
                .map_err(|e| AttemptError::Transient(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<R>()
                    .map_err(|e| AttemptError::Fatal(e.into()));
            }
            let text = response.text().unwrap_or_default();
            Err(classify_status(status, &text, attempt))
        })
    }
}

impl ImageryClient for HttpImageryClient {
    fn search_scenes(
        &self,
        bounds: &Rect<f64>,
        range: &DateRange,
    ) -> Result<Vec<SceneInfo>, TreeMetricsError> {
        let request = SearchRequest {
            bounds: bounds_array(bounds),
            start: range.start,
            end: range.end,
        };
        let response: SearchResponse = self.post_json("scenes:search", &request)?;
        Ok(response.scenes)
    }

    fn fetch_bands(
        &self,
        scene: &SceneInfo,
        bounds: &Rect<f64>,
        bands: &[&str],
        resolution_m: Meter,
    ) -> Result<BandStack, TreeMetricsError> {
        let request = FetchBandsRequest {
            bounds: bounds_array(bounds),
            bands,
            resolution_m,
        };
        let response: FetchBandsResponse =
            self.post_json(&format!("scenes/{}:fetchBands", scene.id), &request)?;
        response.into_band_stack()
    }

    fn sample_canopy_height(
        &self,
        points: &[Coord<f64>],
        resolution_m: Meter,
    ) -> Result<Vec<Option<f64>>, TreeMetricsError> {
        let pairs: Vec<[f64; 2]> = points.iter().map(|c| [c.x, c.y]).collect();
        let request = SampleRequest {
            points: &pairs,
            resolution_m,
            reducer: "mean",
        };
        let response: SampleResponse = self.post_json("canopyHeight:sample", &request)?;
        if response.values.len() != points.len() {
            return Err(TreeMetricsError::RemoteQuery {
                attempts: 1,
                message: format!(
                    "canopy height sampling returned {} values for {} points",
                    response.values.len(),
                    points.len()
                ),
            });
        }
        Ok(response.values)
    }
}

#[cfg(test)]
mod http_client_test {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "busy", 1),
            AttemptError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "", 2),
            AttemptError::Transient(_)
        ));
        match classify_status(StatusCode::NOT_FOUND, "no such scene\n", 1) {
            AttemptError::Fatal(TreeMetricsError::RemoteQuery { attempts, message }) => {
                assert_eq!(attempts, 1);
                assert_eq!(message, "HTTP 404 Not Found: no such scene");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_decode_band_payload() {
        let json = r#"{
            "width": 2,
            "height": 1,
            "geo_transform": [4.0, 0.0001, 0.0, 50.0, 0.0, -0.0001],
            "bands": [
                {"name": "B8", "values": [0.5, null]},
                {"name": "B4", "values": [0.1, 0.2]}
            ]
        }"#;
        let response: FetchBandsResponse = serde_json::from_str(json).unwrap();
        let stack = response.into_band_stack().unwrap();
        let nir = stack.band("B8").unwrap();
        assert_eq!(nir.get(0, 0), Some(0.5));
        assert_eq!(nir.get(1, 0), None);
        assert_eq!(stack.band("B4").unwrap().get(1, 0), Some(0.2));
    }

    #[test]
    fn test_decode_band_payload_wrong_length() {
        let json = r#"{
            "width": 2, "height": 2,
            "geo_transform": [4.0, 0.0001, 0.0, 50.0, 0.0, -0.0001],
            "nodata": -1.0,
            "bands": [{"name": "B8", "values": [0.5, 0.4, 0.3]}]
        }"#;
        let response: FetchBandsResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response.into_band_stack(),
            Err(TreeMetricsError::RasterShape(_))
        ));
    }

    #[test]
    fn test_search_request_shape() {
        let request = SearchRequest {
            bounds: [1.0, 2.0, 3.0, 4.0],
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["start"], "2024-01-01");
        assert_eq!(value["bounds"][3], 4.0);
    }
}
