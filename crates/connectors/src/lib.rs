pub mod error;

pub mod bulk {
    pub mod polling;
    pub mod runtime;
    pub mod transport;
}

pub mod file {
    pub mod csv {
        pub mod error;
        pub mod transport;
    }
}
