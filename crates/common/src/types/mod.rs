use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// One page of a listing, as returned by every list endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

/// A search hit with its distance from the query point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_km: f64,
}

impl<T> Nearby<T> {
    /// Distance rounded to 10 m.
    pub fn new(item: T, distance_km: f64) -> Self {
        Self { item, distance_km: (distance_km * 100.0).round() / 100.0 }
    }
}
