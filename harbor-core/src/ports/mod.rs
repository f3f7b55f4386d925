//! Ports - trait definitions for external collaborators

mod gateway;

pub use gateway::{
    AuthProvider, ConnectivityProvider, FetchResult, GatewayError, GatewayResult, RemoteGateway,
    SubmitOutcome, TransactionPage,
};
