use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::GeocodingConfig;
use crate::services::location_service::{Coordinates, Geocoder, LocationRecord};

/// Client for a Nominatim-compatible geocoding service (no API key).
pub struct NominatimClient {
    http_client: Client,
    reverse_url: String,
    search_url: String,
    country_code: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: PlaceAddress,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    house_number: Option<String>,
    road: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    city_district: Option<String>,
    county: Option<String>,
}

impl PlaceAddress {
    fn city(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.county.as_deref())
    }

    fn area(&self) -> Option<&str> {
        self.suburb
            .as_deref()
            .or(self.neighbourhood.as_deref())
            .or(self.city_district.as_deref())
    }
}

impl Place {
    fn coordinates(&self) -> Result<Coordinates> {
        let latitude = self
            .lat
            .parse()
            .with_context(|| format!("Invalid latitude: {}", self.lat))?;
        let longitude = self
            .lon
            .parse()
            .with_context(|| format!("Invalid longitude: {}", self.lon))?;
        Ok(Coordinates {
            latitude,
            longitude,
        })
    }

    fn into_record(self) -> Result<LocationRecord> {
        let coords = self.coordinates()?;
        let address = self.address;
        let city = address.city().unwrap_or_default().to_string();
        let state = address.state.clone().unwrap_or_else(|| city.clone());

        Ok(LocationRecord {
            address: self.display_name,
            city,
            state,
            latitude: coords.latitude,
            longitude: coords.longitude,
            street_number: address.house_number.clone(),
            street_name: address.road.clone(),
            postal_code: address.postcode.clone(),
            country: address.country.clone(),
            district: address.city_district.clone().or(address.suburb.clone()),
            locality: address.neighbourhood.clone(),
        })
    }

    /// Short "Area, State" label; the full display name when the address
    /// has no usable parts.
    fn label(&self) -> String {
        let address = &self.address;
        let mut parts: Vec<&str> = Vec::new();
        for part in [address.area(), address.city(), address.state.as_deref()]
            .into_iter()
            .flatten()
        {
            if !parts.iter().any(|p| p.eq_ignore_ascii_case(part)) {
                parts.push(part);
            }
        }
        if parts.is_empty() {
            self.display_name.clone()
        } else {
            parts.join(", ")
        }
    }
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self {
            http_client,
            reverse_url: config.reverse_url.clone(),
            search_url: config.search_url.clone(),
            country_code: config.country_code.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse(&self, coords: Coordinates) -> Result<LocationRecord> {
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        debug!("Reverse geocoding {}, {}", lat, lon);

        let body: Value = self
            .http_client
            .get(&self.reverse_url)
            .query(&[
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
            ])
            .send()
            .await
            .context("Reverse geocoding request failed")?
            .error_for_status()
            .context("Reverse geocoding service returned an error")?
            .json()
            .await
            .context("Failed to read reverse geocoding response")?;

        // Nominatim reports "nothing here" as a 200 with an error field
        if let Some(error) = body.get("error") {
            bail!("Reverse geocoding failed: {}", error);
        }

        let place: Place =
            serde_json::from_value(body).context("Unexpected reverse geocoding response")?;
        place.into_record()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        debug!("Searching places for {:?}", query);

        let places: Vec<Place> = self
            .http_client
            .get(&self.search_url)
            .query(&[
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("q", query),
                ("countrycodes", self.country_code.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Place search request failed")?
            .error_for_status()
            .context("Place search service returned an error")?
            .json()
            .await
            .context("Failed to read place search response")?;

        Ok(places.iter().map(Place::label).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> NominatimClient {
        let config = GeocodingConfig {
            reverse_url: format!("{}/reverse", server.url()),
            search_url: format!("{}/search", server.url()),
            ..GeocodingConfig::default()
        };
        NominatimClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_reverse_maps_address_parts() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "display_name": "12 Allen Avenue, Ikeja, Lagos, Nigeria",
                    "lat": "6.6018",
                    "lon": "3.3515",
                    "address": {
                        "house_number": "12",
                        "road": "Allen Avenue",
                        "suburb": "Ikeja",
                        "city": "Ikeja",
                        "state": "Lagos",
                        "country": "Nigeria"
                    }
                }"#,
            )
            .create_async()
            .await;

        let record = client(&server)
            .reverse(Coordinates {
                latitude: 6.6018,
                longitude: 3.3515,
            })
            .await
            .unwrap();

        assert_eq!(record.city, "Ikeja");
        assert_eq!(record.state, "Lagos");
        assert_eq!(record.street_name.as_deref(), Some("Allen Avenue"));
        assert!((record.latitude - 6.6018).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_reverse_error_body_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Unable to geocode"}"#)
            .create_async()
            .await;

        let result = client(&server)
            .reverse(Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_is_country_constrained() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "lekki".into()),
                Matcher::UrlEncoded("countrycodes".into(), "ng".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"display_name": "Lekki, Eti-Osa, Lagos, Nigeria", "lat": "6.44", "lon": "3.47",
                     "address": {"suburb": "Lekki", "county": "Eti-Osa", "state": "Lagos"}},
                    {"display_name": "Somewhere, Nigeria", "lat": "9.0", "lon": "7.0"}
                ]"#,
            )
            .expect(1)
            .create_async()
            .await;

        let labels = client(&server).search("lekki", 8).await.unwrap();
        assert_eq!(labels, vec!["Lekki, Eti-Osa, Lagos", "Somewhere, Nigeria"]);
        mock.assert_async().await;
    }
}
