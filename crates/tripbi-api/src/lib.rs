pub mod auth;
pub mod bookings;
pub mod email;
pub mod error;
pub mod invitations;
pub mod middleware;
pub mod proposals;
pub mod splitbi;
pub mod timelines;
pub mod trips;
pub mod uploads;
pub mod views;
