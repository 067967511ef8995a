pub mod domain;
pub mod ports;
pub mod validation;

pub use domain::{
    Citizen, CitizenPatch, CitizenQuery, NewCitizen, Photo, StoredFile, UpdatedCitizen, Visit,
};
pub use ports::{CitizenStore, PhotoStorage, PortError, PortResult};
