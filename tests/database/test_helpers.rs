use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::{Client, NoTls};

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        let client = connect(&connection_string).await?;
        client.batch_execute(include_str!("schema.sql")).await?;

        Ok(TestDatabase {
            connection_string,
            _container: container
        })
    }

    pub async fn get_client(&self) -> Result<Client, Box<dyn std::error::Error>> {
        connect(&self.connection_string).await
    }

    /// Three public users and one restricted user, with a mix of ranked,
    /// unranked and incomplete scores:
    ///
    /// - user 1 (DE): std 100/95/90/1/1 on ranked maps, one unranked 500pp play
    /// - user 2 (JP): std 50, plus a relax taiko play
    /// - user 3 (xx): no scores, inactive for a year
    /// - user 4: restricted
    pub async fn seed_test_data(&self) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;

        client
            .batch_execute(
                "
            INSERT INTO users (id, username, privileges, latest_activity) VALUES
                (1, 'alice', 3, EXTRACT(EPOCH FROM NOW())::BIGINT),
                (2, 'bob', 3, EXTRACT(EPOCH FROM NOW())::BIGINT),
                (3, 'carol', 3, EXTRACT(EPOCH FROM NOW())::BIGINT - 365 * 86400),
                (4, 'mallory', 0, EXTRACT(EPOCH FROM NOW())::BIGINT);

            INSERT INTO users_stats (id, country, playcount_std, playcount_taiko) VALUES
                (1, 'DE', 6, 0), (2, 'JP', 4, 0), (3, 'XX', 2, 0), (4, 'FR', 9, 0);
            INSERT INTO users_stats_relax (id, playcount_taiko) VALUES
                (1, 0), (2, 3), (3, 0), (4, 0);

            INSERT INTO beatmaps (beatmap_md5, ranked, disable_pp) VALUES
                ('ranked', 2, 0), ('loved', 5, 1), ('pending', 0, 0);

            INSERT INTO scores (userid, beatmap_md5, play_mode, is_relax, pp, accuracy, completed) VALUES
                (1, 'ranked', 0, 0, 100, 99.0, 3),
                (1, 'ranked', 0, 0, 95, 98.0, 3),
                (1, 'ranked', 0, 0, 90, 97.0, 3),
                (1, 'ranked', 0, 0, 1, 60.0, 3),
                (1, 'ranked', 0, 0, 1, 61.0, 3),
                (1, 'loved', 0, 0, 500, 100.0, 3),
                (1, 'ranked', 0, 0, 900, 100.0, 2),
                (2, 'ranked', 0, 0, 50, 95.0, 3),
                (2, 'pending', 1, 1, 40, 93.0, 3),
                (2, 'ranked', 1, 1, 30, 92.0, 3),
                (4, 'ranked', 0, 0, 800, 99.0, 3);

            INSERT INTO password_recovery (u, t) VALUES
                ('old', NOW() - INTERVAL '2 days'), ('fresh', NOW());
            INSERT INTO tokens (user_id, private, last_updated) VALUES
                (1, 1, NOW() - INTERVAL '40 days'),
                (1, 0, NOW() - INTERVAL '40 days'),
                (2, 1, NOW());
            "
            )
            .await?;

        Ok(())
    }
}

async fn connect(connection_string: &str) -> Result<Client, Box<dyn std::error::Error>> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Database connection error: {}", e);
        }
    });

    Ok(client)
}
