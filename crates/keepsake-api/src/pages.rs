use axum::response::Html;

// Server-rendered shells. The interesting behavior lives behind /api; these
// exist so the session guard has pages to protect.

pub async fn home() -> Html<&'static str> {
    Html("<!doctype html><title>Nossas Memórias</title><div id=\"gallery\"></div>")
}

pub async fn admin() -> Html<&'static str> {
    Html("<!doctype html><title>Painel</title><div id=\"admin\"></div>")
}

pub async fn coupons() -> Html<&'static str> {
    Html("<!doctype html><title>Cupons</title><div id=\"coupons\"></div>")
}

pub async fn scratch() -> Html<&'static str> {
    Html("<!doctype html><title>Raspadinha</title><canvas id=\"scratch\"></canvas>")
}
