pub mod model;
pub mod share;

pub use model::{
    new_trip_id, BudgetLevel, Reservation, TravelPace, TravelTip, Trip, TripBudget, TripDay,
    TripStatus,
};
pub use share::{consume_share_fragment, qr_code_url, share_url, ShareError};
