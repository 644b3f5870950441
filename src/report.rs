pub mod daily_rv;
pub mod io;
mod polars_ext;
