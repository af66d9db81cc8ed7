pub mod core {
    pub mod data_type;
    pub mod value;
}

pub mod execution {
    pub mod job;
    pub mod rejected_row;
}

pub mod records {
    pub mod outcome;
    pub mod result_row;
    pub mod row;
}

pub mod schema;
