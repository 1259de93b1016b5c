pub mod ion_series;
pub mod localize;
pub mod mass;
pub mod modification;
pub mod peptide;
pub mod resolver;
pub mod spectrum;
pub mod unimod;
pub mod usi;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Json(serde_json::Error),
    Parse(peptide::ParseError),
    Unimod(unimod::UnimodError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IO(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
            Self::Unimod(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<peptide::ParseError> for Error {
    fn from(e: peptide::ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<unimod::UnimodError> for Error {
    fn from(e: unimod::UnimodError) -> Self {
        Self::Unimod(e)
    }
}

pub fn read_json<S, T>(path: S) -> Result<T, Error>
where
    S: AsRef<str>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&contents)?)
}
