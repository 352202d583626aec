use crate::{MySQLConnection, MySQLTransaction};
use tether_core::{Driver, Environment, Result};

#[derive(Clone, Copy, Default, Debug)]
pub struct MySQLDriver;
impl MySQLDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MySQLDriver {
    type Connection = MySQLConnection;
    type Transaction = MySQLTransaction;

    const NAME: &'static str = "mysql";

    async fn connect(&self, env: &Environment) -> Result<MySQLConnection> {
        MySQLConnection::connect(env).await
    }
}
