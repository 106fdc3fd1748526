//! The submission form and the pipeline behind its submit button.
//!
//! One accepted submission runs, in order:
//!
//! 1. required-field validation (link and at least one project)
//! 2. load the table and pick the next ID
//! 3. citation download and address geocoding, awaited together
//! 4. manual latitude/longitude fallback when geocoding gave no coordinates
//! 5. county resolution
//! 6. append the row and rewrite the table
//!
//! Only validation and store I/O can stop a submission. Everything else
//! degrades to a placeholder value and the row is still written.

use crate::citation::fetch::PageFetcher;
use crate::citation::{CitationBuilder, citation_text};
use crate::geocode::Geocoder;
use crate::models::{Project, ProjectTags, SubmissionRecord};
use crate::reference::PostalLookup;
use crate::resolver::CountyResolver;
use crate::store::SubmissionStore;
use crate::utils::{non_blank, truncate_for_log};
use std::error::Error;
use thiserror::Error as ThisError;
use tracing::{info, instrument, warn};

/// Everything a user can type into the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    pub link: String,
    pub projects: Vec<Project>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub city: Option<String>,
    pub state: String,
    pub zip: Option<String>,
    /// Used only if geocoding yields no latitude.
    pub latitude: Option<String>,
    /// Used only if geocoding yields no longitude.
    pub longitude: Option<String>,
    pub name: Option<String>,
    /// Place or district the article is about.
    pub town: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill out the required fields: Link and Project.")]
    MissingRequired,
}

#[derive(Debug, ThisError)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("could not update the submissions table: {0}")]
    Store(Box<dyn Error>),
}

impl SubmissionForm {
    /// Check required fields and return the distinct project tags.
    pub fn validate(&self) -> Result<ProjectTags, FormError> {
        let projects = ProjectTags::new(self.projects.iter().copied());
        if self.link.trim().is_empty() || projects.is_empty() {
            return Err(FormError::MissingRequired);
        }
        Ok(projects)
    }

    /// Free-text address sent to the geocoder: `"<number> <street>, <city>, <state>"`.
    ///
    /// Empty parts are kept as empty slots so the stored address always has
    /// the same shape.
    pub fn compose_address(&self) -> String {
        let part = |p: &Option<String>| p.as_deref().map(str::trim).unwrap_or_default().to_string();
        format!(
            "{} {}, {}, {}",
            part(&self.street_number),
            part(&self.street_name),
            part(&self.city),
            self.state.trim()
        )
    }
}

/// Geocoded coordinate if present, else a parseable manual override.
pub fn coordinate(geocoded: Option<f64>, manual: Option<&str>) -> Option<f64> {
    geocoded.or_else(|| {
        manual
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    })
}

/// The collaborators a submission needs, constructed once by the caller.
pub struct Services<'a, G, F, P> {
    pub geocoder: &'a G,
    pub citations: &'a CitationBuilder<F>,
    pub resolver: &'a CountyResolver<'a, P>,
    pub store: &'a SubmissionStore,
}

/// Run the full submission pipeline and return the stored record.
#[instrument(level = "info", skip_all, fields(link = %form.link))]
pub async fn submit<G, F, P>(
    form: &SubmissionForm,
    services: &Services<'_, G, F, P>,
) -> Result<SubmissionRecord, SubmitError>
where
    G: Geocoder,
    F: PageFetcher,
    P: PostalLookup,
{
    let projects = match form.validate() {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Rejected submission");
            return Err(e.into());
        }
    };

    let mut records = services.store.load().map_err(SubmitError::Store)?;
    let id = SubmissionStore::next_id(&records);
    let address = form.compose_address();
    info!(id, %address, "Processing submission");

    let (citation, location) = futures::join!(
        services.citations.build(form.link.trim()),
        services.geocoder.geocode(&address)
    );
    if let Err(e) = &citation {
        warn!(error = %e, "Citation degraded to error text");
    }

    let latitude = coordinate(
        location.as_ref().and_then(|l| l.latitude),
        form.latitude.as_deref(),
    );
    let longitude = coordinate(
        location.as_ref().and_then(|l| l.longitude),
        form.longitude.as_deref(),
    );

    let county = services
        .resolver
        .resolve(location.as_ref(), form.city.as_deref(), form.zip.as_deref());

    let record = SubmissionRecord {
        id,
        link: form.link.trim().to_string(),
        project: projects,
        address,
        name: non_blank(form.name.as_deref()),
        town: non_blank(form.town.as_deref()),
        keywords: non_blank(form.keywords.as_deref()),
        citation: citation_text(&citation),
        latitude,
        longitude,
        county,
    };
    info!(
        id,
        county = %record.county,
        lat = ?record.latitude,
        lon = ?record.longitude,
        citation = %truncate_for_log(&record.citation, 120),
        "Built submission record"
    );

    services
        .store
        .append_and_save(&mut records, record.clone())
        .map_err(SubmitError::Store)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::CitationError;
    use crate::models::{LocationCandidate, UNKNOWN_COUNTY};
    use crate::reference::{PostalTable, TownTable};
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct FakeGeocoder {
        result: Option<LocationCandidate>,
        calls: RefCell<Vec<String>>,
    }

    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, address: &str) -> Option<LocationCandidate> {
            self.calls.borrow_mut().push(address.to_string());
            self.result.clone()
        }
    }

    struct FakeFetcher(Option<&'static str>);

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, CitationError> {
            self.0
                .map(str::to_string)
                .ok_or(CitationError::Status(StatusCode::BAD_GATEWAY))
        }
    }

    const PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Roads reopen in Chapel Hill">
        <meta name="author" content="Pat Kim">
        <meta property="article:published_time" content="2024-10-01T12:00:00Z">
    </head></html>"#;

    fn geocoded(postcode: &str) -> LocationCandidate {
        let mut address = BTreeMap::new();
        address.insert("postcode".to_string(), postcode.to_string());
        LocationCandidate {
            latitude: Some(35.91),
            longitude: Some(-79.05),
            display_name: Some("Chapel Hill".to_string()),
            address: Some(address),
        }
    }

    fn form() -> SubmissionForm {
        SubmissionForm {
            link: " https://news.example.org/roads ".to_string(),
            projects: vec![Project::Healthcare],
            street_number: Some("100".to_string()),
            street_name: Some("E Franklin St".to_string()),
            city: Some("Chapel Hill".to_string()),
            state: "North Carolina".to_string(),
            zip: Some("27601".to_string()),
            latitude: Some("1.5".to_string()),
            longitude: Some("oops".to_string()),
            name: Some("  ".to_string()),
            town: Some("Downtown".to_string()),
            keywords: None,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: SubmissionStore,
        postal: PostalTable,
        towns: TownTable,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SubmissionStore::new(dir.path().join("news.csv"));
        Fixture {
            _dir: dir,
            store,
            postal: PostalTable::from_pairs([("27514", "Orange"), ("27601", "Wake")]),
            towns: TownTable::from_pairs([("Chapel Hill", "Orange")]),
        }
    }

    #[test]
    fn test_validate_requires_link_and_project() {
        let mut f = form();
        assert!(f.validate().is_ok());

        f.link = "   ".to_string();
        assert_eq!(f.validate(), Err(FormError::MissingRequired));

        let mut f = form();
        f.projects.clear();
        assert_eq!(f.validate(), Err(FormError::MissingRequired));
    }

    #[test]
    fn test_validate_dedupes_projects() {
        let mut f = form();
        f.projects = vec![Project::Coastal, Project::Coastal, Project::Healthcare];
        assert_eq!(f.validate().unwrap().to_string(), "Coastal, Healthcare");
    }

    #[test]
    fn test_compose_address() {
        assert_eq!(form().compose_address(), "100 E Franklin St, Chapel Hill, North Carolina");
        let empty = SubmissionForm {
            state: "North Carolina".to_string(),
            ..Default::default()
        };
        assert_eq!(empty.compose_address(), " , , North Carolina");
    }

    #[test]
    fn test_coordinate_fallback() {
        assert_eq!(coordinate(Some(35.0), Some("1.0")), Some(35.0));
        assert_eq!(coordinate(None, Some(" 35.25 ")), Some(35.25));
        assert_eq!(coordinate(None, Some("north")), None);
        assert_eq!(coordinate(None, Some("NaN")), None);
        assert_eq!(coordinate(None, None), None);
    }

    #[tokio::test]
    async fn test_submit_happy_path() {
        let fx = fixture();
        let resolver = CountyResolver::new(&fx.postal, &fx.towns);
        let geocoder = FakeGeocoder {
            result: Some(geocoded("27514")),
            calls: RefCell::new(Vec::new()),
        };
        let citations = CitationBuilder::new(FakeFetcher(Some(PAGE)));
        let services = Services {
            geocoder: &geocoder,
            citations: &citations,
            resolver: &resolver,
            store: &fx.store,
        };

        let record = submit(&form(), &services).await.unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.link, "https://news.example.org/roads");
        assert_eq!(record.county, "Orange");
        assert_eq!(record.latitude, Some(35.91));
        assert_eq!(record.longitude, Some(-79.05));
        assert_eq!(record.name, None);
        assert_eq!(record.town.as_deref(), Some("Downtown"));
        assert_eq!(
            record.citation,
            "Pat Kim. Roads reopen in Chapel Hill. https://news.example.org; 2024."
        );
        assert_eq!(
            *geocoder.calls.borrow(),
            vec!["100 E Franklin St, Chapel Hill, North Carolina".to_string()]
        );

        let second = submit(&form(), &services).await.unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(fx.store.load().unwrap(), vec![record, second]);
    }

    #[tokio::test]
    async fn test_submit_degrades_every_collaborator() {
        let fx = fixture();
        let resolver = CountyResolver::new(&fx.postal, &fx.towns);
        let geocoder = FakeGeocoder {
            result: None,
            calls: RefCell::new(Vec::new()),
        };
        let citations = CitationBuilder::new(FakeFetcher(None));
        let services = Services {
            geocoder: &geocoder,
            citations: &citations,
            resolver: &resolver,
            store: &fx.store,
        };

        let mut f = form();
        f.city = Some("Nowhereville".to_string());
        f.zip = Some("00000".to_string());

        let record = submit(&f, &services).await.unwrap();
        assert_eq!(record.county, UNKNOWN_COUNTY);
        assert_eq!(record.latitude, Some(1.5));
        assert_eq!(record.longitude, None);
        assert!(record.citation.starts_with("Could not extract citation:"));
        assert_eq!(fx.store.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_submission_writes_nothing() {
        let fx = fixture();
        let resolver = CountyResolver::new(&fx.postal, &fx.towns);
        let geocoder = FakeGeocoder {
            result: None,
            calls: RefCell::new(Vec::new()),
        };
        let citations = CitationBuilder::new(FakeFetcher(Some(PAGE)));
        let services = Services {
            geocoder: &geocoder,
            citations: &citations,
            resolver: &resolver,
            store: &fx.store,
        };

        let mut f = form();
        f.projects.clear();
        let err = submit(&f, &services).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(FormError::MissingRequired)));
        assert!(!fx.store.path().exists());
        assert!(geocoder.calls.borrow().is_empty());
    }
}
